//! Engine configuration.

/// Configuration for a [`crate::KvFactory`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Whether every commit syncs the log before resolving (safer but slower).
    pub sync_on_commit: bool,

    /// File extension of per-database log files in a directory factory.
    pub log_extension: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sync_on_commit: true,
            log_extension: "rkdb".to_string(),
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to sync the log on every commit.
    #[must_use]
    pub fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets the log file extension.
    #[must_use]
    pub fn log_extension(mut self, ext: impl Into<String>) -> Self {
        self.log_extension = ext.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = EngineConfig::default();
        assert!(config.sync_on_commit);
        assert_eq!(config.log_extension, "rkdb");
    }

    #[test]
    fn builder_pattern() {
        let config = EngineConfig::new()
            .sync_on_commit(false)
            .log_extension("log");
        assert!(!config.sync_on_commit);
        assert_eq!(config.log_extension, "log");
    }
}
