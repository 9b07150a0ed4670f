use std::env;
use std::path::PathBuf;

use crate::models::comment::MAX_COMMENT_LENGTH;

#[derive(Debug, Clone)]
pub struct Config {
    pub comments: CommentSettings,
    pub catalog_path: Option<PathBuf>,
    pub log_filter: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentSettings {
    pub max_body_length: usize,
    pub recent_window_minutes: i64,
}

impl Default for CommentSettings {
    fn default() -> Self {
        Self {
            max_body_length: MAX_COMMENT_LENGTH,
            recent_window_minutes: 60,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            comments: CommentSettings::default(),
            catalog_path: None,
            log_filter: "learning_core=info".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first, local .env as fallback
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/*.toml + ENV overrides (prefix: APP_)
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let defaults = Config::default();

        let max_body_length = settings
            .get_int("comments.max_body_length")
            .ok()
            .or_else(|| parse_env("COMMENT_MAX_LENGTH"))
            .map(|value| value.clamp(1, MAX_COMMENT_LENGTH as i64) as usize)
            .unwrap_or(defaults.comments.max_body_length);

        let recent_window_minutes = settings
            .get_int("comments.recent_window_minutes")
            .ok()
            .or_else(|| parse_env("COMMENT_RECENT_WINDOW_MINUTES"))
            .unwrap_or(defaults.comments.recent_window_minutes);

        if recent_window_minutes <= 0 {
            return Err(config::ConfigError::Message(format!(
                "comments.recent_window_minutes must be positive, got {}",
                recent_window_minutes
            )));
        }

        let catalog_path = settings
            .get_string("catalog.path")
            .or_else(|_| env::var("CATALOG_PATH"))
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        let log_filter = settings
            .get_string("logging.filter")
            .or_else(|_| env::var("RUST_LOG"))
            .unwrap_or(defaults.log_filter);

        Ok(Config {
            comments: CommentSettings {
                max_body_length,
                recent_window_minutes,
            },
            catalog_path,
            log_filter,
        })
    }
}

fn parse_env(key: &str) -> Option<i64> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            eprintln!("WARNING: Ignoring non-numeric {}={}", key, raw);
            None
        }
    }
}
