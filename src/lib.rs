//! # Leaderboard Server
//!
//! Ranking server for game clients. Clients submit scores for up to
//! [`MAX_BOARDS`] leaderboards and query a user's zero-based rank
//! (descending by score) on one board or across all of them.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   LEADERBOARD SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  protocol/       - Wire format                               │
//! │  ├── command.rs  - Command + Method request types            │
//! │  └── codec.rs    - base64/percent decode, response encode    │
//! │                                                              │
//! │  dispatch.rs     - Validation gate and command routing       │
//! │                                                              │
//! │  board/          - Ranking logic                             │
//! │  ├── store.rs    - Ordered-set store seam (Redis / memory)   │
//! │  └── service.rs  - Per-board bounds and rank fan-out         │
//! │                                                              │
//! │  network/        - Transport (thin)                          │
//! │  └── server.rs   - HTTP POST listener over tokio TCP         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Requests flow transport → codec → dispatcher → service → store and
//! back out as plain-text bodies. The core holds no mutable shared
//! state; all cross-request state lives in the ordered-set store.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod board;
pub mod dispatch;
pub mod network;
pub mod protocol;

// Re-export commonly used types
pub use board::service::Leaderboards;
pub use board::store::{MemoryScoreStore, RedisScoreStore, ScoreStore, StoreError};
pub use dispatch::{Dispatcher, Response};
pub use network::server::{HttpServer, ServerConfig, ServerError};
pub use protocol::command::{Command, Method};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of leaderboards; valid board ids are `1..=MAX_BOARDS`.
pub const MAX_BOARDS: usize = 10;

/// Exclusive upper bound on scores; a valid score is `0 < s < MAX_SCORE`.
pub const MAX_SCORE: i64 = 10_000_000;

/// Sentinel rank for a user with no entry, or a failed lookup.
pub const RANK_INVALID: i64 = -1;

/// Exclusive upper bound on user name length in characters.
pub const MAX_NAME_LEN: usize = 17;

/// Request bodies larger than this are rejected with 413.
pub const MAX_BODY_BYTES: usize = 1024;

/// Store key prefix; board `n` lives in the ordered set `lbd:n`.
pub const BOARD_KEY_PREFIX: &str = "lbd";
