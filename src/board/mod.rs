//! Leaderboard Layer
//!
//! Ranking logic over an external ordered-set store. The store keeps one
//! sorted set per leaderboard; this layer derives key names, enforces
//! score bounds, and maps absent entries to the invalid-rank sentinel.

pub mod service;
pub mod store;

pub use service::Leaderboards;
pub use store::{MemoryScoreStore, RedisScoreStore, ScoreStore, StoreError};
