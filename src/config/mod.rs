pub mod settings;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Localizable label of the sibling folder soft-deleted files move into.
    pub deleted_folder_name: String,
    /// Eviction target: keep at least this much process memory available.
    pub cache_min_free_memory_mb: u64,
    pub max_decode_retries: u8,
    /// Zero-padding width for renumbering; 0 means auto width.
    pub default_counter_digits: usize,
    pub case_sensitive_search: bool,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        settings::load_config()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            deleted_folder_name: "deleted".to_string(),
            cache_min_free_memory_mb: 512,
            max_decode_retries: 3,
            default_counter_digits: 0,
            case_sensitive_search: false,
        }
    }
}
