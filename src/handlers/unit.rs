//! Organizational unit catalog endpoint

use axum::{extract::State, response::Json};

use crate::state::AppState;
use crate::unit::Bagian;

/// GET /api/units
pub async fn list_units(State(state): State<AppState>) -> Json<Vec<Bagian>> {
    Json(state.units.units().to_vec())
}
