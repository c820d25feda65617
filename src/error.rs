//! Error types for the playback path and the phoneme-timing port.

use thiserror::Error;

/// Terminal outcome of a failed playback run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("speech synthesis failed")]
    Synthesis,
    #[error("playback deadline exceeded")]
    Timeout,
    #[error("playback cancelled")]
    Cancelled,
    #[error("invalid playback request: {0}")]
    InvalidRequest(&'static str),
}

/// Failure reported by a `PhonemeSource` implementation; the controller
/// falls back to fixed-rate timing on either variant.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PhonemeSourceError {
    #[error("audio query failed: {0}")]
    QueryFailed(String),
    #[error("malformed audio query: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_failure_detail() {
        assert_eq!(
            PlaybackError::InvalidRequest("negative start time").to_string(),
            "invalid playback request: negative start time"
        );
        assert_eq!(
            PhonemeSourceError::QueryFailed("server down".into()).to_string(),
            "audio query failed: server down"
        );
    }
}
