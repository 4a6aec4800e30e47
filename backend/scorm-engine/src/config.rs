use serde::Deserialize;
use std::env;

const DEFAULT_UPSERT_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub mongo_database: String,
    pub bind_addr: String,
    /// Process-wide default for recording; a request can only narrow it.
    pub recording_enabled: bool,
    pub upsert_attempts: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mongo_uri: "mongodb://localhost:27017".to_string(),
            mongo_database: "scorm".to_string(),
            bind_addr: "0.0.0.0:8081".to_string(),
            recording_enabled: true,
            upsert_attempts: DEFAULT_UPSERT_ATTEMPTS,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Local .env first, then the repository root one
        if dotenvy::dotenv().is_err() {
            dotenvy::from_path("../../.env").ok();
        }

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            // Override with environment variables (prefix: APP_)
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let defaults = Config::default();

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or(defaults.mongo_uri);

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or(defaults.mongo_database);

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or(defaults.bind_addr);

        let recording_enabled = settings
            .get_bool("scorm.recording_enabled")
            .ok()
            .or_else(|| {
                env::var("SCORM_RECORDING_ENABLED")
                    .ok()
                    .and_then(|value| parse_flag(&value))
            })
            .unwrap_or(defaults.recording_enabled);

        let upsert_attempts = settings
            .get_int("store.upsert_attempts")
            .ok()
            .and_then(|value| usize::try_from(value).ok())
            .or_else(|| {
                env::var("STORE_UPSERT_ATTEMPTS")
                    .ok()
                    .and_then(|value| value.parse::<usize>().ok())
            })
            .filter(|value| *value > 0)
            .unwrap_or(defaults.upsert_attempts);

        Ok(Config {
            mongo_uri,
            mongo_database,
            bind_addr,
            recording_enabled,
            upsert_attempts,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "APP_ENV",
        "MONGO_URI",
        "MONGO_DATABASE",
        "BIND_ADDR",
        "SCORM_RECORDING_ENABLED",
        "STORE_UPSERT_ATTEMPTS",
        "APP__SCORM__RECORDING_ENABLED",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn load_falls_back_to_defaults() {
        clear_env();
        env::set_var("APP_ENV", "config-test-missing");

        let config = Config::load().unwrap();

        assert_eq!(config.mongo_database, "scorm");
        assert!(config.recording_enabled);
        assert_eq!(config.upsert_attempts, DEFAULT_UPSERT_ATTEMPTS);
        clear_env();
    }

    #[test]
    #[serial]
    fn plain_env_vars_override_defaults() {
        clear_env();
        env::set_var("APP_ENV", "config-test-missing");
        env::set_var("MONGO_DATABASE", "scorm_test");
        env::set_var("SCORM_RECORDING_ENABLED", "off");
        env::set_var("STORE_UPSERT_ATTEMPTS", "0");

        let config = Config::load().unwrap();

        assert_eq!(config.mongo_database, "scorm_test");
        assert!(!config.recording_enabled);
        assert_eq!(config.upsert_attempts, DEFAULT_UPSERT_ATTEMPTS);
        clear_env();
    }

    #[test]
    #[serial]
    fn prefixed_env_wins_over_plain_env() {
        clear_env();
        env::set_var("APP_ENV", "config-test-missing");
        env::set_var("SCORM_RECORDING_ENABLED", "true");
        env::set_var("APP__SCORM__RECORDING_ENABLED", "false");

        let config = Config::load().unwrap();

        assert!(!config.recording_enabled);
        clear_env();
    }

    #[test]
    fn parse_flag_accepts_common_spellings() {
        assert_eq!(parse_flag("Yes"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
