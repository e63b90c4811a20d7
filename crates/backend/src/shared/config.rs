use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

/// Строка подключения и настройки пула
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout_secs() -> u64 {
    8
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[server]
host = "127.0.0.1"
port = 3000

[database]
url = "sqlite://db/products.db?mode=rwc"
max_connections = 5
min_connections = 1
connect_timeout_secs = 8
"#;

/// Environment variable that overrides `database.url`
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Load configuration from config.toml file
///
/// Search order:
/// 1. Next to the executable (for production)
/// 2. Falls back to embedded default config
///
/// `DATABASE_URL` from the environment wins over both.
pub fn load_config() -> anyhow::Result<Config> {
    let config = read_config_file()?;
    Ok(apply_overrides(config, std::env::var(DATABASE_URL_ENV).ok()))
}

fn read_config_file() -> anyhow::Result<Config> {
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let config_path = exe_dir.join("config.toml");

            if config_path.exists() {
                tracing::info!("Loading config from: {}", config_path.display());
                let contents = std::fs::read_to_string(&config_path)?;
                return parse_config(&contents);
            } else {
                tracing::warn!("config.toml not found at: {}", config_path.display());
            }
        }
    }

    tracing::info!("Using default embedded configuration");
    parse_config(DEFAULT_CONFIG)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let config: Config = toml::from_str(contents)?;
    Ok(config)
}

pub fn apply_overrides(mut config: Config, database_url: Option<String>) -> Config {
    if let Some(url) = database_url.filter(|u| !u.trim().is_empty()) {
        tracing::info!("Database URL taken from {}", DATABASE_URL_ENV);
        config.database.url = url;
    }
    config
}
