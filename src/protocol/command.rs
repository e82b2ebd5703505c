//! Request Types
//!
//! The decoded intent of one client request. A [`Command`] lives for the
//! duration of a single request and is never persisted.

/// Operations a client can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Set one score on one leaderboard.
    Score,
    /// Set a batch of scores, one per leaderboard in index order.
    Scores,
    /// Get the user's rank on one leaderboard.
    Rank,
    /// Get the user's rank on every leaderboard.
    Ranks,
}

impl Method {
    /// Parse the wire name of a method. Unknown names yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "score" => Some(Method::Score),
            "scores" => Some(Method::Scores),
            "rank" => Some(Method::Rank),
            "ranks" => Some(Method::Ranks),
            _ => None,
        }
    }

    /// The wire name of this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Score => "score",
            Method::Scores => "scores",
            Method::Rank => "rank",
            Method::Ranks => "ranks",
        }
    }
}

/// One decoded client request.
///
/// Fields the request did not carry (or that failed to parse) keep their
/// defaults; the dispatcher's validation gate rejects those.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Requested operation; `None` when `m` was missing or unrecognized.
    pub method: Option<Method>,
    /// Target leaderboard id, meaningful for `score` and `rank`.
    pub which: i64,
    /// Scores; `scores[0]` carries the single score for `score`, the whole
    /// vector carries one score per leaderboard index for `scores`.
    pub scores: Vec<i64>,
    /// Submitting user's name.
    pub user_name: String,
}

impl Default for Command {
    fn default() -> Self {
        Self {
            method: None,
            which: -1,
            scores: vec![0],
            user_name: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse_roundtrip() {
        for m in [Method::Score, Method::Scores, Method::Rank, Method::Ranks] {
            assert_eq!(Method::parse(m.as_str()), Some(m));
        }
        assert_eq!(Method::parse("rankz"), None);
        assert_eq!(Method::parse(""), None);
        assert_eq!(Method::parse("SCORE"), None);
    }

    #[test]
    fn test_command_defaults() {
        let cmd = Command::default();
        assert_eq!(cmd.method, None);
        assert_eq!(cmd.which, -1);
        assert_eq!(cmd.scores, vec![0]);
        assert!(cmd.user_name.is_empty());
    }
}
