// src/config.rs

use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;

use crate::error::AppError;

/// Rows per feed page. A shorter page means the end of the feed.
pub const FEED_PAGE_SIZE: usize = 20;

/// Maximum length of an AI-generated caption.
pub const GENERATED_CAPTION_MAX_CHARS: usize = 280;

pub const DEFAULT_REALTIME_CHANNEL: &str = "posts_created";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token used to sign the headless runner in at startup.
    pub session_token: Option<String>,
    pub rust_log: String,
    pub feed_page_size: usize,
    pub realtime_channel: String,
    pub storage_root: PathBuf,
    pub storage_public_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub voice_settings_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let feed_page_size = match env::var("FEED_PAGE_SIZE") {
            Ok(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or_else(|| {
                    AppError::BadRequest(format!("FEED_PAGE_SIZE must be a positive integer, got '{}'", raw))
                })?,
            Err(_) => FEED_PAGE_SIZE,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            session_token: optional("SESSION_TOKEN"),
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            feed_page_size,
            realtime_channel: env::var("REALTIME_CHANNEL")
                .unwrap_or_else(|_| DEFAULT_REALTIME_CHANNEL.to_string()),
            storage_root: env::var("STORAGE_ROOT")
                .unwrap_or_else(|_| "./data/storage".to_string())
                .into(),
            storage_public_url: env::var("STORAGE_PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:8000/storage/".to_string()),
            gemini_api_key: optional("GEMINI_API_KEY"),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash-exp".to_string()),
            voice_settings_path: env::var("VOICE_SETTINGS_PATH")
                .unwrap_or_else(|_| "./data/voice_settings.json".to_string())
                .into(),
        })
    }
}

fn required(key: &str) -> Result<String, AppError> {
    env::var(key).map_err(|_| AppError::BadRequest(format!("{} must be set", key)))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
