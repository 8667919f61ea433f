// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use zyeute::backend::{AuthProvider, GeminiCaptioner, JwtSessionStore, LocalObjectStore, PgRealtime, PgRepository};
use zyeute::config::Config;
use zyeute::error::AppError;
use zyeute::feed::{FeedAssembler, ViewerLookup};
use zyeute::screens::voice::VoiceSettingsStore;
use zyeute::state::AppState;

const MAX_DB_RETRIES: u32 = 5;

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let file_appender = tracing_appender::rolling::daily("logs", "zyeute.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    if let Err(e) = run(config).await {
        tracing::error!("Feed runner stopped: {}", e);
        std::process::exit(1);
    }
}

async fn connect(database_url: &str) -> Result<PgPool, AppError> {
    let mut retry_count = 0;
    loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) => {
                retry_count += 1;
                if retry_count > MAX_DB_RETRIES {
                    return Err(AppError::Network(format!(
                        "Failed to connect to database after {} retries: {}",
                        MAX_DB_RETRIES, e
                    )));
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}

/// First page, retried while the backend is unreachable. Anything else is
/// left for the next reload.
async fn initial_load(feed: &FeedAssembler) {
    let mut retry_count = 0;
    loop {
        match feed.load().await {
            Ok(_) => return,
            Err(e) if e.is_retryable() && retry_count < MAX_DB_RETRIES => {
                retry_count += 1;
                tracing::warn!("Feed not ready ({}), retrying in 2s... (Attempt {})", e, retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
            Err(e) => {
                tracing::warn!("Initial feed load failed: {}", e);
                return;
            }
        }
    }
}

async fn run(config: Config) -> Result<(), AppError> {
    let pool = connect(&config.database_url).await?;
    tracing::info!("Database connected...");

    let auth = Arc::new(JwtSessionStore::new(&config.jwt_secret));
    if let Some(token) = &config.session_token {
        if let Err(e) = auth.sign_in_with_token(token) {
            tracing::warn!("SESSION_TOKEN rejected, continuing signed out: {}", e);
        }
    }

    let storage = LocalObjectStore::new(&config.storage_root, &config.storage_public_url)?;
    let mut state = AppState::new(
        Arc::new(PgRepository::new(pool.clone())),
        auth,
        Arc::new(PgRealtime::new(pool, &config.realtime_channel)),
        Arc::new(storage),
    )
    .with_page_size(config.feed_page_size);

    match &config.gemini_api_key {
        Some(key) => {
            state = state.with_captioner(Arc::new(GeminiCaptioner::new(key, &config.gemini_model)));
        }
        None => tracing::info!("GEMINI_API_KEY not set, caption generation disabled"),
    }

    let voice = VoiceSettingsStore::new(&config.voice_settings_path).load().await;
    tracing::info!(personality = ?voice.personality, enabled = voice.enabled, "voice preferences loaded");

    let feed = FeedAssembler::start(&state).await;
    let lookup = ViewerLookup::from_state(&state);
    feed.resolve_viewer(&lookup).await;
    feed.watch_session(lookup, state.auth.on_session_change()).await;
    initial_load(&feed).await;

    let snapshot = feed.snapshot().await;
    tracing::info!(
        posts = snapshot.posts.len(),
        has_more = snapshot.has_more,
        viewer = snapshot.viewer.as_ref().map(|u| u.username.as_str()).unwrap_or("-"),
        "feed ready, streaming new posts (ctrl-c to stop)"
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(30));
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let snapshot = feed.snapshot().await;
                tracing::info!(posts = snapshot.posts.len(), page = snapshot.page, "feed status");
            }
        }
    }

    feed.release().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
