use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub web: WebConfig,
    // Populated from the .env file
    pub database_path: String,
    pub jwt_secret_key: String,
    pub jwt_access_token_expires: i64,
    pub password_hash_cost: u32,
    pub allowed_origins: String,
    pub log_level: String,
}

fn required_var(name: &str) -> Result<String, config::ConfigError> {
    env::var(name).map_err(|_| {
        config::ConfigError::Message(format!(
            "FATAL: Environment variable '{}' is not set in your .env file.",
            name
        ))
    })
}

impl Config {
    pub fn from_env(env_path: &Path) -> Result<Self, config::ConfigError> {
        dotenvy::from_path(env_path).map_err(|e| {
            config::ConfigError::Message(format!(
                "FATAL: Failed to load .env file from '{}'. Error: {}",
                env_path.display(),
                e
            ))
        })?;

        let database_path = required_var("DATABASE_PATH")?;
        if Path::new(&database_path).is_relative() {
            return Err(config::ConfigError::Message(format!(
                "FATAL: The 'DATABASE_PATH' in your .env file is a relative path ('{}'). It MUST be an absolute path.",
                database_path
            )));
        }

        let jwt_secret_key = required_var("JWT_SECRET_KEY")?;
        if jwt_secret_key.len() < MIN_JWT_SECRET_LEN {
            return Err(config::ConfigError::Message(format!(
                "FATAL: 'JWT_SECRET_KEY' must be at least {} characters long.",
                MIN_JWT_SECRET_LEN
            )));
        }

        let jwt_access_token_expires = match env::var("JWT_ACCESS_TOKEN_EXPIRES") {
            Ok(raw) => match raw.trim().parse::<i64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(config::ConfigError::Message(
                        "FATAL: 'JWT_ACCESS_TOKEN_EXPIRES' must be a positive number of seconds.".to_string(),
                    ))
                }
            },
            Err(_) => 3600,
        };

        let password_hash_cost = match env::var("PASSWORD_HASH_COST") {
            Ok(raw) => match raw.trim().parse::<u32>() {
                Ok(cost) if (4..=31).contains(&cost) => cost,
                _ => {
                    return Err(config::ConfigError::Message(
                        "FATAL: 'PASSWORD_HASH_COST' must be a whole number between 4 and 31.".to_string(),
                    ))
                }
            },
            Err(_) => bcrypt::DEFAULT_COST,
        };

        let allowed_origins = env::var("ALLOWED_ORIGINS").unwrap_or_default();
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let builder = config::Config::builder()
            // Host and port live in the TOML file; everything else comes from .env.
            .add_source(config::File::new("config/default.toml", config::FileFormat::Toml))
            .set_override("database_path", database_path)?
            .set_override("jwt_secret_key", jwt_secret_key)?
            .set_override("jwt_access_token_expires", jwt_access_token_expires)?
            .set_override("password_hash_cost", password_hash_cost as i64)?
            .set_override("allowed_origins", allowed_origins)?
            .set_override("log_level", log_level)?
            .build()?;

        builder.try_deserialize()
    }

    /// Full path to the SQLite file holding users, resources, posts, comments and likes.
    pub fn app_db_path(&self) -> PathBuf {
        PathBuf::from(&self.database_path)
            .join("community")
            .join("community.db")
    }

    /// Full path to the redb file holding revoked token ids.
    pub fn token_store_path(&self) -> PathBuf {
        PathBuf::from(&self.database_path)
            .join("tokens")
            .join("revoked_tokens.redb")
    }
}
