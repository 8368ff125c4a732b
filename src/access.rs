//! Role gate
//!
//! Decides, per request, what kind of session a path needs and what happens
//! when the session falls short. Pages answer with redirects, the API with
//! 401/403.

use axum::http::Method;

pub use crate::entity::user::Role;

pub const LOGIN_PAGE: &str = "/login";
pub const DASHBOARD_PAGE: &str = "/dashboard";

/// Session required by a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Admin,
}

/// Outcome of checking a session against an [`Access`] level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    /// No session: send to the login page
    Login,
    /// Signed in without the needed role: send to the dashboard
    Dashboard,
}

pub fn gate(role: Option<Role>, required: Access) -> GateDecision {
    match (required, role) {
        (Access::Public, _) => GateDecision::Allow,
        (_, None) => GateDecision::Login,
        (Access::Authenticated, Some(_)) => GateDecision::Allow,
        (Access::Admin, Some(Role::Admin)) => GateDecision::Allow,
        (Access::Admin, Some(_)) => GateDecision::Dashboard,
    }
}

pub fn is_mutating(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

/// Access level for a request
pub fn required_access(method: &Method, path: &str) -> Access {
    match path.strip_prefix("/api") {
        Some(api) if api.is_empty() || api.starts_with('/') => api_access(method, api),
        _ => page_access(path),
    }
}

fn api_access(method: &Method, path: &str) -> Access {
    match path {
        "/health" | "/login" | "/csrf-token" => return Access::Public,
        "/surat-tamu" if *method == Method::POST => return Access::Public,
        "/logout" => return Access::Authenticated,
        _ => {}
    }

    if under(path, "/users") || under(path, "/log-aktivitas") || is_mutating(method) {
        Access::Admin
    } else {
        Access::Authenticated
    }
}

fn page_access(path: &str) -> Access {
    let last = path.rsplit('/').next().unwrap_or_default();
    if path == LOGIN_PAGE || last.contains('.') {
        return Access::Public;
    }

    let admin_page = under(path, "/users")
        || path.split('/').any(|segment| segment == "tambah" || segment == "edit");
    if admin_page {
        Access::Admin
    } else {
        Access::Authenticated
    }
}

/// `path` is `prefix` or below it
fn under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .map(|rest| rest.is_empty() || rest.starts_with('/'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_matrix() {
        assert_eq!(gate(None, Access::Public), GateDecision::Allow);
        assert_eq!(gate(None, Access::Authenticated), GateDecision::Login);
        assert_eq!(gate(None, Access::Admin), GateDecision::Login);
        assert_eq!(gate(Some(Role::Member), Access::Authenticated), GateDecision::Allow);
        assert_eq!(gate(Some(Role::Member), Access::Admin), GateDecision::Dashboard);
        assert_eq!(gate(Some(Role::Admin), Access::Admin), GateDecision::Allow);
    }

    #[test]
    fn test_public_api_routes() {
        assert_eq!(required_access(&Method::POST, "/api/login"), Access::Public);
        assert_eq!(required_access(&Method::GET, "/api/csrf-token"), Access::Public);
        assert_eq!(required_access(&Method::GET, "/api/health"), Access::Public);
        assert_eq!(required_access(&Method::POST, "/api/surat-tamu"), Access::Public);
        assert_eq!(required_access(&Method::GET, "/api/surat-tamu"), Access::Authenticated);
    }

    #[test]
    fn test_reads_need_session_and_mutations_need_admin() {
        assert_eq!(required_access(&Method::GET, "/api/surat-masuk"), Access::Authenticated);
        assert_eq!(required_access(&Method::GET, "/api/disposisi/3"), Access::Authenticated);
        assert_eq!(required_access(&Method::POST, "/api/surat-masuk"), Access::Admin);
        assert_eq!(
            required_access(&Method::POST, "/api/surat-masuk/7/copy-disposisi"),
            Access::Admin
        );
        assert_eq!(required_access(&Method::DELETE, "/api/surat-keluar/1"), Access::Admin);
        assert_eq!(required_access(&Method::POST, "/api/logout"), Access::Authenticated);
    }

    #[test]
    fn test_admin_only_api() {
        assert_eq!(required_access(&Method::GET, "/api/users"), Access::Admin);
        assert_eq!(required_access(&Method::GET, "/api/users/5"), Access::Admin);
        assert_eq!(required_access(&Method::GET, "/api/log-aktivitas"), Access::Admin);
        assert_eq!(required_access(&Method::GET, "/api/usersx"), Access::Authenticated);
    }

    #[test]
    fn test_pages() {
        assert_eq!(required_access(&Method::GET, "/login"), Access::Public);
        assert_eq!(required_access(&Method::GET, "/assets/index-3f2a.js"), Access::Public);
        assert_eq!(required_access(&Method::GET, "/dashboard"), Access::Authenticated);
        assert_eq!(required_access(&Method::GET, "/surat-masuk"), Access::Authenticated);
        assert_eq!(required_access(&Method::GET, "/surat-masuk/tambah"), Access::Admin);
        assert_eq!(required_access(&Method::GET, "/disposisi/4/edit"), Access::Admin);
        assert_eq!(required_access(&Method::GET, "/users"), Access::Admin);
    }

    #[test]
    fn test_api_prefix_must_be_a_segment() {
        assert_eq!(required_access(&Method::GET, "/apidocs"), Access::Authenticated);
    }
}
