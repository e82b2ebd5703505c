//! Command Dispatch
//!
//! Validates decoded commands and routes them to the leaderboard service.
//! Every rejected request gets an explicit error response; a caller can
//! always tell a rejection from network loss.

use tracing::{debug, error};

use crate::board::service::Leaderboards;
use crate::protocol::codec;
use crate::protocol::command::{Command, Method};
use crate::{MAX_BOARDS, MAX_NAME_LEN, MAX_SCORE};

/// Plain-text response handed back to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl Response {
    /// A 200 response with the given body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// An error response; the body is `Error <status>`.
    pub fn error(status: u16) -> Self {
        Self {
            status,
            body: format!("Error {status}"),
        }
    }
}

/// Routes validated commands to the leaderboard service.
pub struct Dispatcher {
    boards: Leaderboards,
}

impl Dispatcher {
    /// Create a dispatcher over a leaderboard service.
    pub fn new(boards: Leaderboards) -> Self {
        Self { boards }
    }

    /// Decode a raw request body and dispatch it.
    pub async fn handle_body(&self, raw: &[u8]) -> Response {
        match codec::decode(raw) {
            Ok(cmd) => self.dispatch(cmd).await,
            Err(err) => {
                debug!(error = %err, "undecodable request body");
                Response::error(400)
            }
        }
    }

    /// Validate and route one command.
    ///
    /// Gate: the method must be recognized and the user name non-empty
    /// and under [`MAX_NAME_LEN`] characters. Each route adds its own
    /// bounds checks; anything out of bounds is a 400.
    pub async fn dispatch(&self, cmd: Command) -> Response {
        let name_len = cmd.user_name.chars().count();
        let method = match cmd.method {
            Some(m) if name_len > 0 && name_len < MAX_NAME_LEN => m,
            _ => {
                debug!(method = ?cmd.method, name_len, "rejected command");
                return Response::error(400);
            }
        };

        match method {
            Method::Score => self.handle_score(&cmd).await,
            Method::Rank => self.handle_rank(&cmd).await,
            Method::Scores => self.handle_scores(&cmd).await,
            Method::Ranks => self.handle_ranks(&cmd).await,
        }
    }

    async fn handle_score(&self, cmd: &Command) -> Response {
        let score = cmd.scores.first().copied().unwrap_or(0);
        if !board_in_range(cmd.which) || score <= 0 || score >= MAX_SCORE {
            debug!(which = cmd.which, score, "score out of bounds");
            return Response::error(400);
        }

        match self
            .boards
            .set_user_score(cmd.which as u32, &cmd.user_name, score)
            .await
        {
            Ok(()) => Response::ok("OK"),
            Err(err) => {
                error!(which = cmd.which, error = %err, "score write failed");
                Response::error(500)
            }
        }
    }

    async fn handle_rank(&self, cmd: &Command) -> Response {
        if !board_in_range(cmd.which) {
            debug!(which = cmd.which, "rank board out of bounds");
            return Response::error(400);
        }

        let rank = self
            .boards
            .get_user_rank(cmd.which as u32, &cmd.user_name)
            .await;
        Response::ok(codec::encode_rank(rank))
    }

    async fn handle_scores(&self, cmd: &Command) -> Response {
        if cmd.scores.len() > MAX_BOARDS {
            debug!(len = cmd.scores.len(), "too many scores in batch");
            return Response::error(400);
        }

        match self
            .boards
            .set_user_scores(&cmd.user_name, &cmd.scores)
            .await
        {
            Ok(()) => Response::ok("OK"),
            Err(err) => {
                error!(error = %err, "batch score write failed");
                Response::error(500)
            }
        }
    }

    async fn handle_ranks(&self, cmd: &Command) -> Response {
        let ranks = self.boards.get_user_ranks(&cmd.user_name).await;
        Response::ok(codec::encode_ranks(&ranks))
    }
}

fn board_in_range(which: i64) -> bool {
    which > 0 && which <= MAX_BOARDS as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::store::{FlakyScoreStore, MemoryScoreStore, ScoreStore};
    use crate::protocol::codec::encode_command;
    use crate::RANK_INVALID;
    use std::sync::Arc;

    fn dispatcher() -> (Dispatcher, Arc<MemoryScoreStore>) {
        let store = Arc::new(MemoryScoreStore::new());
        let boards = Leaderboards::new(store.clone());
        (Dispatcher::new(boards), store)
    }

    fn score_cmd(which: i64, score: i64, name: &str) -> Command {
        Command {
            method: Some(Method::Score),
            which,
            scores: vec![score],
            user_name: name.into(),
        }
    }

    #[tokio::test]
    async fn test_score_then_rank() {
        let (d, _) = dispatcher();
        let resp = d.dispatch(score_cmd(3, 1500, "player1")).await;
        assert_eq!(resp, Response::ok("OK"));

        let resp = d
            .dispatch(Command {
                method: Some(Method::Rank),
                which: 3,
                user_name: "player1".into(),
                ..Command::default()
            })
            .await;
        assert_eq!(resp, Response::ok("0"));
    }

    #[tokio::test]
    async fn test_rank_of_absent_user() {
        let (d, _) = dispatcher();
        let resp = d
            .dispatch(Command {
                method: Some(Method::Rank),
                which: 1,
                user_name: "nobody".into(),
                ..Command::default()
            })
            .await;
        assert_eq!(resp, Response::ok("-1"));
    }

    #[tokio::test]
    async fn test_validation_gate_rejections() {
        let (d, store) = dispatcher();

        // no method
        let resp = d
            .dispatch(Command {
                user_name: "u".into(),
                ..Command::default()
            })
            .await;
        assert_eq!(resp.status, 400);

        // empty name, 17-char name
        assert_eq!(d.dispatch(score_cmd(1, 100, "")).await.status, 400);
        assert_eq!(
            d.dispatch(score_cmd(1, 100, "seventeen-chars-x")).await.status,
            400
        );

        // nothing was written
        assert_eq!(store.rank("lbd:1", "u").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_score_boundary_rejections() {
        let (d, store) = dispatcher();

        assert_eq!(d.dispatch(score_cmd(0, 100, "u")).await.status, 400);
        assert_eq!(d.dispatch(score_cmd(11, 100, "u")).await.status, 400);
        assert_eq!(d.dispatch(score_cmd(1, 0, "u")).await.status, 400);
        assert_eq!(d.dispatch(score_cmd(1, MAX_SCORE, "u")).await.status, 400);
        assert_eq!(d.dispatch(score_cmd(1, -5, "u")).await.status, 400);

        for board in 1..=MAX_BOARDS {
            let key = format!("lbd:{board}");
            assert_eq!(store.rank(&key, "u").await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn test_boundary_accepts_edges() {
        let (d, _) = dispatcher();
        assert_eq!(d.dispatch(score_cmd(1, 1, "u")).await.status, 200);
        assert_eq!(d.dispatch(score_cmd(10, MAX_SCORE - 1, "u")).await.status, 200);
        // 16-char name is the longest valid one
        assert_eq!(d.dispatch(score_cmd(1, 5, "sixteen-chars-xx")).await.status, 200);
    }

    #[tokio::test]
    async fn test_rank_boundary_rejections() {
        let (d, _) = dispatcher();
        for which in [0, 11, -1] {
            let resp = d
                .dispatch(Command {
                    method: Some(Method::Rank),
                    which,
                    user_name: "u".into(),
                    ..Command::default()
                })
                .await;
            assert_eq!(resp.status, 400);
        }
    }

    #[tokio::test]
    async fn test_scores_batch_partial_validity() {
        let (d, _) = dispatcher();
        let resp = d
            .dispatch(Command {
                method: Some(Method::Scores),
                which: -1,
                scores: vec![5_000_000, -1, 20_000_000, 100, 0, 1, 2, 3, 4, 5],
                user_name: "u".into(),
            })
            .await;
        assert_eq!(resp, Response::ok("OK"));

        let resp = d
            .dispatch(Command {
                method: Some(Method::Ranks),
                user_name: "u".into(),
                ..Command::default()
            })
            .await;
        assert_eq!(resp, Response::ok("0,-1,-1,0,-1,0,0,0,0,0"));
    }

    #[tokio::test]
    async fn test_scores_batch_too_long() {
        let (d, store) = dispatcher();
        let resp = d
            .dispatch(Command {
                method: Some(Method::Scores),
                which: -1,
                scores: vec![100; 11],
                user_name: "u".into(),
            })
            .await;
        assert_eq!(resp.status, 400);
        assert_eq!(store.rank("lbd:1", "u").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ranks_all_boards_in_order() {
        let (d, _) = dispatcher();
        d.dispatch(score_cmd(2, 100, "u")).await;
        d.dispatch(score_cmd(9, 200, "u")).await;

        let resp = d
            .dispatch(Command {
                method: Some(Method::Ranks),
                user_name: "u".into(),
                ..Command::default()
            })
            .await;
        let ranks: Vec<i64> = resp.body.split(',').map(|r| r.parse().unwrap()).collect();
        assert_eq!(ranks.len(), MAX_BOARDS);
        assert_eq!(ranks[1], 0);
        assert_eq!(ranks[8], 0);
        assert_eq!(ranks[0], RANK_INVALID);
    }

    #[tokio::test]
    async fn test_handle_body_full_pipeline() {
        let (d, _) = dispatcher();
        let body = encode_command(&score_cmd(1, 42, "player1"));
        let resp = d.handle_body(body.as_bytes()).await;
        assert_eq!(resp, Response::ok("OK"));

        let body = encode_command(&Command {
            method: Some(Method::Rank),
            which: 1,
            user_name: "player1".into(),
            ..Command::default()
        });
        let resp = d.handle_body(body.as_bytes()).await;
        assert_eq!(resp, Response::ok("0"));
    }

    #[tokio::test]
    async fn test_handle_body_undecodable() {
        let (d, _) = dispatcher();
        assert_eq!(d.handle_body(b"junk").await.status, 400);
        assert_eq!(d.handle_body(b"").await.status, 400);
        assert_eq!(d.handle_body(b"x=abc").await.status, 400);
        // an envelope that is present but not base64 is the same rejection
        assert_eq!(d.handle_body(b"d=!!not-base64").await, Response::error(400));
    }

    fn flaky_dispatcher(fail_board: &str) -> Dispatcher {
        let store = Arc::new(FlakyScoreStore::failing_on(fail_board));
        Dispatcher::new(Leaderboards::new(store))
    }

    #[tokio::test]
    async fn test_score_write_failure_returns_500() {
        let d = flaky_dispatcher("lbd:1");
        let resp = d.dispatch(score_cmd(1, 100, "u")).await;
        assert_eq!(resp, Response::error(500));
        assert_eq!(resp.body, "Error 500");
    }

    #[tokio::test]
    async fn test_scores_write_failure_returns_single_500() {
        let d = flaky_dispatcher("lbd:5");
        let resp = d
            .dispatch(Command {
                method: Some(Method::Scores),
                which: -1,
                scores: vec![100; MAX_BOARDS],
                user_name: "u".into(),
            })
            .await;
        assert_eq!(resp, Response::error(500));
    }

    #[tokio::test]
    async fn test_rank_store_failure_reports_invalid() {
        let d = flaky_dispatcher("lbd:4");
        let resp = d
            .dispatch(Command {
                method: Some(Method::Rank),
                which: 4,
                user_name: "u".into(),
                ..Command::default()
            })
            .await;
        // lookups degrade to -1 rather than erroring the request
        assert_eq!(resp, Response::ok("-1"));
    }

    #[tokio::test]
    async fn test_ranks_store_failure_isolated_to_position() {
        let d = flaky_dispatcher("lbd:4");
        d.dispatch(score_cmd(3, 100, "u")).await;
        d.dispatch(score_cmd(5, 100, "u")).await;

        let resp = d
            .dispatch(Command {
                method: Some(Method::Ranks),
                user_name: "u".into(),
                ..Command::default()
            })
            .await;
        assert_eq!(resp, Response::ok("-1,-1,0,-1,0,-1,-1,-1,-1,-1"));
    }
}
