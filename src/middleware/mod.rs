//! Request middleware: session authentication, role gate and CSRF

pub mod auth;
pub mod csrf;

pub use auth::{auth_layer, CurrentUser};
pub use csrf::csrf_layer;
