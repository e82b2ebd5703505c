//! Ordered-Set Store
//!
//! The storage seam the ranking logic depends on: a set of independent
//! ordered key-score maps supporting idempotent upsert-by-member and
//! rank/score lookup. Rank order is descending by score; ties follow the
//! backend's consistent total order.
//!
//! Two implementations: [`RedisScoreStore`] (sorted sets, the production
//! backend) and [`MemoryScoreStore`] (in-process, for development and
//! tests; mirrors Redis ordering so both rank identically).

use std::collections::BTreeMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::RwLock;

/// Errors from the storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Redis connectivity or command failure.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// An ordered key-score set per board, addressed by board key name.
///
/// `rank` is zero-based in descending score order. All operations are
/// independent per board; no cross-board guarantees.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Insert or replace `member`'s score on the named board.
    async fn upsert(&self, board: &str, member: &str, score: i64) -> Result<(), StoreError>;

    /// Zero-based rank of `member` on the named board, best score first.
    /// `None` when the member has no entry.
    async fn rank(&self, board: &str, member: &str) -> Result<Option<u64>, StoreError>;

    /// Current score of `member` on the named board.
    async fn score(&self, board: &str, member: &str) -> Result<Option<i64>, StoreError>;
}

/// Redis-backed store: one sorted set per board (ZADD / ZREVRANK / ZSCORE).
pub struct RedisScoreStore {
    conn: ConnectionManager,
}

impl RedisScoreStore {
    /// Connect to Redis at `url` (e.g. `redis://127.0.0.1/`).
    ///
    /// The manager multiplexes one connection across all boards and
    /// reconnects on failure; a board handle is just its key name.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl ScoreStore for RedisScoreStore {
    async fn upsert(&self, board: &str, member: &str, score: i64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.zadd(board, member, score).await?;
        Ok(())
    }

    async fn rank(&self, board: &str, member: &str) -> Result<Option<u64>, StoreError> {
        let mut conn = self.conn.clone();
        let rank: Option<u64> = conn.zrevrank(board, member).await?;
        Ok(rank)
    }

    async fn score(&self, board: &str, member: &str) -> Result<Option<i64>, StoreError> {
        let mut conn = self.conn.clone();
        let score: Option<i64> = conn.zscore(board, member).await?;
        Ok(score)
    }
}

/// In-process store. Not persistent; intended for tests and for running
/// without a Redis instance.
#[derive(Default)]
pub struct MemoryScoreStore {
    boards: RwLock<BTreeMap<String, BTreeMap<String, i64>>>,
}

impl MemoryScoreStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScoreStore for MemoryScoreStore {
    async fn upsert(&self, board: &str, member: &str, score: i64) -> Result<(), StoreError> {
        let mut boards = self.boards.write().await;
        boards
            .entry(board.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn rank(&self, board: &str, member: &str) -> Result<Option<u64>, StoreError> {
        let boards = self.boards.read().await;
        let set = match boards.get(board) {
            Some(set) => set,
            None => return Ok(None),
        };
        let score = match set.get(member) {
            Some(&score) => score,
            None => return Ok(None),
        };
        // Descending by score; equal scores ordered member-descending,
        // matching ZREVRANK (the reverse of ZRANK's lexicographic ties).
        let ahead = set
            .iter()
            .filter(|&(m, &s)| s > score || (s == score && m.as_str() > member))
            .count();
        Ok(Some(ahead as u64))
    }

    async fn score(&self, board: &str, member: &str) -> Result<Option<i64>, StoreError> {
        let boards = self.boards.read().await;
        Ok(boards.get(board).and_then(|set| set.get(member).copied()))
    }
}

/// Store double that fails every operation on one board key and counts
/// attempts; exercises the failure paths the real backends only hit
/// when Redis is down.
#[cfg(test)]
pub(crate) struct FlakyScoreStore {
    inner: MemoryScoreStore,
    fail_board: String,
    attempts: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl FlakyScoreStore {
    pub(crate) fn failing_on(board: impl Into<String>) -> Self {
        Self {
            inner: MemoryScoreStore::new(),
            fail_board: board.into(),
            attempts: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Operations attempted so far, including failed ones.
    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(std::sync::atomic::Ordering::Relaxed)
    }

    fn injected_error() -> StoreError {
        StoreError::Redis(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "injected store failure",
        )))
    }

    fn record(&self, board: &str) -> Result<(), StoreError> {
        self.attempts
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        if board == self.fail_board {
            Err(Self::injected_error())
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ScoreStore for FlakyScoreStore {
    async fn upsert(&self, board: &str, member: &str, score: i64) -> Result<(), StoreError> {
        self.record(board)?;
        self.inner.upsert(board, member, score).await
    }

    async fn rank(&self, board: &str, member: &str) -> Result<Option<u64>, StoreError> {
        self.record(board)?;
        self.inner.rank(board, member).await
    }

    async fn score(&self, board: &str, member: &str) -> Result<Option<i64>, StoreError> {
        self.record(board)?;
        self.inner.score(board, member).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rank_descending_by_score() {
        let store = MemoryScoreStore::new();
        store.upsert("b", "low", 100).await.unwrap();
        store.upsert("b", "high", 900).await.unwrap();
        store.upsert("b", "mid", 500).await.unwrap();

        assert_eq!(store.rank("b", "high").await.unwrap(), Some(0));
        assert_eq!(store.rank("b", "mid").await.unwrap(), Some(1));
        assert_eq!(store.rank("b", "low").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_rank_missing_member_and_board() {
        let store = MemoryScoreStore::new();
        assert_eq!(store.rank("nope", "x").await.unwrap(), None);

        store.upsert("b", "a", 1).await.unwrap();
        assert_eq!(store.rank("b", "nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_replaces_score() {
        let store = MemoryScoreStore::new();
        store.upsert("b", "u", 100).await.unwrap();
        store.upsert("b", "v", 200).await.unwrap();
        assert_eq!(store.rank("b", "u").await.unwrap(), Some(1));

        store.upsert("b", "u", 300).await.unwrap();
        assert_eq!(store.score("b", "u").await.unwrap(), Some(300));
        assert_eq!(store.rank("b", "u").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_tie_order_is_total_and_consistent() {
        let store = MemoryScoreStore::new();
        store.upsert("b", "anna", 500).await.unwrap();
        store.upsert("b", "zoe", 500).await.unwrap();

        let anna = store.rank("b", "anna").await.unwrap().unwrap();
        let zoe = store.rank("b", "zoe").await.unwrap().unwrap();
        assert_ne!(anna, zoe);
        // ZREVRANK places the lexicographically greater member first
        assert_eq!(zoe, 0);
        assert_eq!(anna, 1);
    }

    #[tokio::test]
    async fn test_boards_are_independent() {
        let store = MemoryScoreStore::new();
        store.upsert("b1", "u", 100).await.unwrap();
        assert_eq!(store.rank("b2", "u").await.unwrap(), None);
    }
}
