use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FilesConfig {
    /// Startup value of the retention switch. The `DISABLE_REMOVE_GLOBAL_FILE`
    /// environment variable overrides it at every delete.
    #[serde(default)]
    pub disable_remove_global_file: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub files: FilesConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("database.max_connections", 10)?
            .set_default("files.disable_remove_global_file", false)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., REGISTRY__DATABASE__URL)
            .add_source(Environment::with_prefix("REGISTRY").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
