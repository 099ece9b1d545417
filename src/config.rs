use config::{Config, ConfigError, Environment};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub server_port: u16,
    pub jwt_secret: String,
    pub environment: String,
    pub cors_allowed_origins: Vec<String>,
    pub run_migrations: bool,
}

impl AppConfig {
    /// Reads settings from the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        Config::builder()
            .set_default("server_port", 8080)?
            .set_default("environment", "development")?
            .set_default("cors_allowed_origins", vec!["http://localhost:5173"])?
            .set_default("run_migrations", true)?
            .add_source(
                Environment::default()
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_allowed_origins"),
            )
            .build()?
            .try_deserialize()
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.server_port)
    }
}
