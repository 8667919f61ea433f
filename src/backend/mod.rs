//! Ports to the hosted services and their adapters.

pub mod auth;
pub mod caption;
pub mod memory;
pub mod postgres;
pub mod realtime;
pub mod repository;
pub mod storage;

pub use auth::{AuthProvider, JwtSessionStore, Session};
pub use caption::{CaptionGenerator, GeminiCaptioner};
pub use memory::{MemoryRealtime, MemoryRepository};
pub use postgres::PgRepository;
pub use realtime::{ChangeKind, PgRealtime, RealtimeSource, Subscription};
pub use repository::Repository;
pub use storage::{LocalObjectStore, ObjectStore};
