use ::config::{ConfigBuilder, ConfigError, Environment, File};
use mero_authz::AuditMode;
use mero_database::DatabaseConfig;
use serde::Deserialize;
use std::collections::HashMap;

const CONFIG_FILE: &str = "config/mero";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub authz: AuthzConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Required permission slugs keyed by operation id (`"METHOD /route"`)
    #[serde(default)]
    pub permissions: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthzConfig {
    pub audit_mode: AuditMode,
    /// How often expired time-based grants are deactivated; 0 disables the sweep
    pub grant_sweep_interval_secs: u64,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            audit_mode: AuditMode::Inline,
            grant_sweep_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
}

impl Config {
    /// Defaults, then `config/mero.toml` if present, then `MERO__*` variables.
    /// `DATABASE_URL` and `JWT_SECRET` override everything else.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = ::config::Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix("MERO")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::finish(builder)
    }

    /// Build from an in-memory TOML document plus the well-known variables
    #[cfg(test)]
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let builder =
            ::config::Config::builder().add_source(File::from_str(source, ::config::FileFormat::Toml));

        Self::finish(builder)
    }

    fn finish(
        builder: ConfigBuilder<::config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("auth.jwt_secret", std::env::var("JWT_SECRET").ok())?
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests touch process-wide environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("JWT_SECRET");

        let config = Config::from_toml(
            r#"
            [auth]
            jwt_secret = "test-secret-key-min-32-characters-long"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.authz.audit_mode, AuditMode::Inline);
        assert_eq!(config.authz.grant_sweep_interval_secs, 300);
        assert!(!config.logging.json);
        assert!(config.permissions.is_empty());
    }

    #[test]
    fn test_sections_and_permission_overrides() {
        let _lock = ENV_LOCK.lock().unwrap();
        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("JWT_SECRET");

        let config = Config::from_toml(
            r#"
            [server]
            port = 8080

            [auth]
            jwt_secret = "test-secret-key-min-32-characters-long"

            [authz]
            audit_mode = "background"
            grant_sweep_interval_secs = 0

            [logging]
            json = true

            [permissions]
            "POST /api/boards" = ["boards.create"]
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.authz.audit_mode, AuditMode::Background);
        assert_eq!(config.authz.grant_sweep_interval_secs, 0);
        assert!(config.logging.json);
        assert_eq!(config.permissions.len(), 1);
        let slugs = config.permissions.values().next().unwrap();
        assert_eq!(slugs, &vec!["boards.create".to_string()]);
    }

    #[test]
    fn test_well_known_variables_win() {
        let _lock = ENV_LOCK.lock().unwrap();
        std::env::set_var("DATABASE_URL", "postgresql://env-host/mero");
        std::env::set_var("JWT_SECRET", "from-the-environment");

        let config = Config::from_toml(
            r#"
            [database]
            url = "postgresql://file-host/mero"

            [auth]
            jwt_secret = "from-the-file"
            "#,
        )
        .unwrap();

        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("JWT_SECRET");

        assert_eq!(config.database.url, "postgresql://env-host/mero");
        assert_eq!(config.auth.jwt_secret, "from-the-environment");
    }

    #[test]
    fn test_missing_jwt_secret_is_an_error() {
        let _lock = ENV_LOCK.lock().unwrap();
        std::env::remove_var("JWT_SECRET");

        assert!(Config::from_toml("").is_err());
    }
}
