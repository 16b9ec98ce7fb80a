use serde::{Deserialize, Serialize};

/// Engine tuning knobs, loadable from rgl.toml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Cap on the remote pending-command buffer. Exceeding it is treated as
    /// an unrecoverable allocation failure and loses the context.
    #[serde(default = "default_max_pending_bytes")]
    pub max_pending_bytes: usize,

    /// How many times a blocking wait issued without a prior flush logs a
    /// warning before going quiet.
    #[serde(default = "default_sync_flush_warn_limit")]
    pub sync_flush_warn_limit: u32,

    /// Cap on queued validation errors awaiting `get_error` drains.
    #[serde(default = "default_max_error_queue")]
    pub max_error_queue: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            max_pending_bytes: default_max_pending_bytes(),
            sync_flush_warn_limit: default_sync_flush_warn_limit(),
            max_error_queue: default_max_error_queue(),
        }
    }
}

impl ProxyConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: ProxyConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from file if it exists, otherwise return defaults.
    pub fn load_or_default(path: &str) -> Self {
        Self::load(path).unwrap_or_default()
    }
}

fn default_max_pending_bytes() -> usize {
    64 * 1024 * 1024
}

fn default_sync_flush_warn_limit() -> u32 {
    4
}

fn default_max_error_queue() -> usize {
    128
}
