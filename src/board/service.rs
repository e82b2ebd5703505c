//! Leaderboard Service
//!
//! Thin orchestration over the ordered-set store: one sorted set per
//! board id, keyed `<prefix>:<id>`. Batch operations fan out to the
//! boards independently; nothing here is transactional across boards.

use std::sync::Arc;

use tracing::warn;

use crate::board::store::{ScoreStore, StoreError};
use crate::{BOARD_KEY_PREFIX, MAX_BOARDS, MAX_SCORE, RANK_INVALID};

/// Leaderboard operations over a [`ScoreStore`].
pub struct Leaderboards {
    store: Arc<dyn ScoreStore>,
    prefix: String,
}

impl Leaderboards {
    /// Create a service using the default `lbd` key prefix.
    pub fn new(store: Arc<dyn ScoreStore>) -> Self {
        Self::with_prefix(store, BOARD_KEY_PREFIX)
    }

    /// Create a service with a custom key prefix (separate namespaces on
    /// a shared store).
    pub fn with_prefix(store: Arc<dyn ScoreStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// Store key for a board id.
    fn board_key(&self, board: u32) -> String {
        format!("{}:{}", self.prefix, board)
    }

    /// Set `user`'s score on one board. Last write wins; store errors
    /// propagate without retry.
    pub async fn set_user_score(
        &self,
        board: u32,
        user: &str,
        score: i64,
    ) -> Result<(), StoreError> {
        self.store.upsert(&self.board_key(board), user, score).await
    }

    /// Set `user`'s scores across boards: `scores[t - 1]` goes to board
    /// `t`. Out-of-bounds elements are skipped individually. Every write
    /// is attempted even when one fails; the first failure is reported
    /// once after the batch.
    pub async fn set_user_scores(&self, user: &str, scores: &[i64]) -> Result<(), StoreError> {
        let mut first_err = None;

        for board in 1..=MAX_BOARDS {
            let score = match scores.get(board - 1) {
                Some(&s) => s,
                None => break,
            };
            if score <= 0 || score >= MAX_SCORE {
                continue;
            }
            if let Err(err) = self
                .store
                .upsert(&self.board_key(board as u32), user, score)
                .await
            {
                warn!(board, user, error = %err, "batch score write failed");
                first_err.get_or_insert(err);
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// `user`'s zero-based rank on one board, or [`RANK_INVALID`] when the
    /// user has no entry or the store call fails (failure is logged).
    pub async fn get_user_rank(&self, board: u32, user: &str) -> i64 {
        match self.store.rank(&self.board_key(board), user).await {
            Ok(Some(rank)) => rank as i64,
            Ok(None) => RANK_INVALID,
            Err(err) => {
                warn!(board, user, error = %err, "rank lookup failed");
                RANK_INVALID
            }
        }
    }

    /// `user`'s rank on every board in id order. Individual absences or
    /// failures yield [`RANK_INVALID`] at their position; the call as a
    /// whole never fails.
    pub async fn get_user_ranks(&self, user: &str) -> Vec<i64> {
        let mut ranks = Vec::with_capacity(MAX_BOARDS);
        for board in 1..=MAX_BOARDS {
            ranks.push(self.get_user_rank(board as u32, user).await);
        }
        ranks
    }

    /// `user`'s stored score on one board, if any.
    pub async fn get_user_score(&self, board: u32, user: &str) -> Result<Option<i64>, StoreError> {
        self.store.score(&self.board_key(board), user).await
    }
}
