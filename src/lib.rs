// src/lib.rs

pub mod backend;
pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod screens;
pub mod state;
pub mod utils;

pub use feed::{FeedAssembler, FeedSnapshot, LoadOutcome};
pub use state::AppState;
