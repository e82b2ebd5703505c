//! Wire Codec
//!
//! Decodes raw request bodies into [`Command`]s and encodes results back
//! into response bodies.
//!
//! A request body is `d=<payload>`, percent-encoded, where the payload is
//! base64 of UTF-8 text like `m=score&w=3&s=1500&n=player1`. Each inner
//! `key=value` pair is percent-decoded on its own. Decoding degrades to
//! field defaults on anything malformed inside the envelope; only a
//! missing or undecodable `d=` envelope is an error.

use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{alphabet, Engine};
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};

use crate::protocol::command::{Command, Method};

/// Standard-alphabet engine that tolerates stripped padding. Clients send
/// padded base64, but naive percent-handling along the way can eat the
/// trailing `=` characters.
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Failures decoding the outer request envelope.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The body carried no `d=` field.
    #[error("request body has no d= field")]
    MissingData,

    /// The `d` payload was not valid base64.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Decode a raw request body into a [`Command`].
///
/// Only the outer envelope can fail: a missing `d=` field or a payload
/// that is not base64. A bad payload could instead degrade to garbage
/// text and fall through to field defaults, but the command it would
/// yield is rejected by validation anyway, so it is reported as a
/// decode error here where the cause is still visible.
pub fn decode(raw: &[u8]) -> Result<Command, DecodeError> {
    let body = String::from_utf8_lossy(raw);
    let body = percent_decode_str(&body).decode_utf8_lossy().into_owned();

    let (key, payload) = body.split_once('=').ok_or(DecodeError::MissingData)?;
    if key != "d" {
        return Err(DecodeError::MissingData);
    }

    let bytes = BASE64.decode(payload.trim())?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(parse_fields(&text))
}

/// Parse the inner `&`-separated field list. Never fails: unparsable
/// values keep the [`Command`] defaults, unknown keys are ignored for
/// forward compatibility.
fn parse_fields(text: &str) -> Command {
    let mut cmd = Command::default();

    for pair in text.split('&') {
        let (key, value) = match pair.split_once('=') {
            Some(kv) => kv,
            None => continue,
        };
        let key = percent_decode_str(key).decode_utf8_lossy();
        let value = percent_decode_str(value).decode_utf8_lossy();

        match key.as_ref() {
            "m" => cmd.method = Method::parse(&value),
            "w" => cmd.which = value.parse().unwrap_or(-1),
            "s" => cmd.scores[0] = value.parse().unwrap_or(0),
            "n" => cmd.user_name = value.into_owned(),
            "a" => cmd.scores = value.split(',').map(|v| v.parse().unwrap_or(0)).collect(),
            _ => {}
        }
    }

    cmd
}

/// Encode a single rank as a response body.
pub fn encode_rank(rank: i64) -> String {
    rank.to_string()
}

/// Encode a rank list as a response body; an empty list encodes as "".
pub fn encode_ranks(ranks: &[i64]) -> String {
    ranks
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Build the request body a game client would send for `cmd`.
///
/// Mirrors the client side of the protocol: inner fields for the method,
/// UTF-8 → base64 → percent-encoded `d=` envelope. Used by tests and
/// tooling; the inverse of [`decode`] for every valid command shape.
pub fn encode_command(cmd: &Command) -> String {
    let mut text = String::new();

    if let Some(method) = cmd.method {
        text.push_str("m=");
        text.push_str(method.as_str());
    }

    match cmd.method {
        Some(Method::Score) => {
            let score = cmd.scores.first().copied().unwrap_or(0);
            push_field(&mut text, "w", &cmd.which.to_string());
            push_field(&mut text, "s", &score.to_string());
        }
        Some(Method::Rank) => {
            push_field(&mut text, "w", &cmd.which.to_string());
        }
        Some(Method::Scores) => {
            push_field(&mut text, "a", &encode_ranks(&cmd.scores));
        }
        Some(Method::Ranks) | None => {}
    }
    push_field(&mut text, "n", &cmd.user_name);

    let payload = BASE64.encode(text.as_bytes());
    format!("d={}", utf8_percent_encode(&payload, NON_ALPHANUMERIC))
}

fn push_field(text: &mut String, key: &str, value: &str) {
    text.push('&');
    text.push_str(key);
    text.push('=');
    text.push_str(&utf8_percent_encode(value, NON_ALPHANUMERIC).to_string());
}
