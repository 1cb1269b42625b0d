//! Configuration for a runtime session.

use ax_core::DatabaseConfig;

/// Configuration for a [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// RNG seed for reproducible `random` calls. `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Log every global variable read and write at debug level.
    pub log_variable_access: bool,
    /// Settings for the object database.
    pub database: DatabaseConfig,
}

impl RuntimeConfig {
    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enable or disable variable access logging.
    pub fn with_log_variable_access(mut self, enabled: bool) -> Self {
        self.log_variable_access = enabled;
        self
    }

    /// Replace the database settings.
    pub fn with_database(mut self, database: DatabaseConfig) -> Self {
        self.database = database;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.seed, None);
        assert!(!cfg.log_variable_access);
        assert!(cfg.database.load_default_packages);
    }

    #[test]
    fn config_builder() {
        let cfg = RuntimeConfig::default()
            .with_seed(7)
            .with_log_variable_access(true)
            .with_database(DatabaseConfig::default().with_load_default_packages(false));
        assert_eq!(cfg.seed, Some(7));
        assert!(cfg.log_variable_access);
        assert!(!cfg.database.load_default_packages);
    }
}
