use std::path::PathBuf;
use std::time::Duration;

/// How often the background saver checks for unsaved answers.
pub const DEFAULT_SAVE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Controls where a ledger persists and what it builds at load time.
#[derive(Clone, Debug)]
pub struct LedgerConfig {
    /// Data file to load from and save to. `None` keeps the ledger in memory only.
    pub path: Option<PathBuf>,
    /// Build the term index after loading.
    pub index_terms: bool,
    /// Period of the background save task.
    pub save_interval: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: None,
            index_terms: true,
            save_interval: DEFAULT_SAVE_INTERVAL,
        }
    }
}

impl LedgerConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_term_index(mut self, enabled: bool) -> Self {
        self.index_terms = enabled;
        self
    }

    pub fn with_save_interval(mut self, interval: Duration) -> Self {
        self.save_interval = interval;
        self
    }
}
