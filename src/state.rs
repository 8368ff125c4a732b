use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::Config;
use crate::unit::UnitCatalog;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Application configuration
    pub config: Arc<Config>,
    /// Organizational units for disposition targets
    pub units: Arc<UnitCatalog>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let units = config.unit_catalog();
        Self {
            db,
            config: Arc::new(config),
            units: Arc::new(units),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::Bagian;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn test_state_uses_configured_units() {
        let config = Config {
            units: vec![Bagian::new("Bagian Umum", &[])],
            ..Config::default()
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let state = AppState::new(db, config);
        assert_eq!(state.units.units().len(), 1);
    }
}
