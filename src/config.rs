use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    pub database_url: String,

    /// Comma-separated list of CORS origins. Unset means any origin.
    pub allowed_origins: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    listen_addr: Option<String>,
    database_url: Option<String>,
    allowed_origins: Option<String>,
    max_connections: Option<u32>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_max_connections() -> u32 {
    10
}

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config: PartialServerConfig = if let Some(path_str) = config_path {
            let path = Path::new(path_str);
            if path.exists() {
                let contents = fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
                toml::from_str(&contents)
                    .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))?
            } else {
                PartialServerConfig::default()
            }
        } else {
            PartialServerConfig::default()
        };

        // 2. Load from environment variables
        let env_config = PartialServerConfig {
            listen_addr: env::var("LISTEN_ADDR").ok(),
            database_url: env::var("DATABASE_URL").ok(),
            allowed_origins: env::var("ALLOWED_ORIGINS").ok(),
            max_connections: match env::var("MAX_CONNECTIONS") {
                Ok(raw) => Some(
                    raw.parse::<u32>()
                        .map_err(|e| format!("MAX_CONNECTIONS must be an integer: {e}"))?,
                ),
                Err(_) => None,
            },
        };

        // 3. Merge: environment overrides file
        merge(file_config, env_config)
    }

    /// The configured CORS origins, split and trimmed. Empty when unset.
    pub fn allowed_origin_list(&self) -> Vec<String> {
        self.allowed_origins
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn merge(file: PartialServerConfig, env: PartialServerConfig) -> Result<ServerConfig, String> {
    Ok(ServerConfig {
        listen_addr: env
            .listen_addr
            .or(file.listen_addr)
            .unwrap_or_else(default_listen_addr),
        database_url: env
            .database_url
            .or(file.database_url)
            .ok_or_else(|| "DATABASE_URL must be set (env or config file)".to_string())?,
        allowed_origins: env.allowed_origins.or(file.allowed_origins),
        max_connections: env
            .max_connections
            .or(file.max_connections)
            .unwrap_or_else(default_max_connections),
    })
}
