use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Engine tuning knobs, all with conservative defaults
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngineConfig {
    /// Length of generated transaction references
    pub reference_length: usize,
    /// Attempts before a reference collision is treated as a defect
    pub reference_max_attempts: u32,
    /// How long a mutating operation may wait on an account lock
    pub lock_wait_ms: u64,
    /// Cap applied to caller-supplied page sizes
    pub max_page_size: u32,
    /// Minor-unit scale for amounts crossing the API boundary (2 = cents)
    pub amount_decimals: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reference_length: 12,
            reference_max_attempts: 10,
            lock_wait_ms: 2000,
            max_page_size: 100,
            amount_decimals: 2,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "./logs".to_string(),
            log_file: "walletcore.log".to_string(),
            use_json: false,
            rotation: "daily".to_string(),
            engine: EngineConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Self {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .unwrap_or_else(|_| panic!("Failed to read config file: {}", config_path));
        serde_yaml::from_str(&content).expect("Failed to parse config yaml")
    }
}
