/// Configuration for an [`ArticyDatabase`](crate::ArticyDatabase).
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Load every default package when the database is created.
    pub load_default_packages: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            load_default_packages: true,
        }
    }
}

impl DatabaseConfig {
    /// Enable or disable loading default packages on creation.
    pub fn with_load_default_packages(mut self, load: bool) -> Self {
        self.load_default_packages = load;
        self
    }
}
