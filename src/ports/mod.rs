//! Port traits for the external collaborators this core drives.
//! Implementations (HTTP clients for the synthesizer and animation
//! servers) live outside the crate and are injected as `Arc<dyn _>`.

use std::future::Future;
use std::pin::Pin;

use crate::error::PhonemeSourceError;
use crate::label::ExpressionLabel;
use crate::timeline::AccentPhrase;

pub type PortFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Animation-server side: switches the on-screen face.
pub trait ExpressionActuator: Send + Sync {
    /// Returns false on failure. Must not panic; the scheduler keeps
    /// running and retries on the next differing switch.
    fn set_expression(&self, label: ExpressionLabel) -> PortFuture<bool>;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeechHint {
    pub duration_secs: f64,
}

pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesizes and plays the whole utterance; resolves when audio ends.
    fn speak(&self, text: String) -> PortFuture<bool>;

    /// Optional duration estimate before committing to playback.
    fn prepare(&self, text: String) -> PortFuture<Option<SpeechHint>> {
        let _ = text;
        Box::pin(async { None })
    }
}

/// Optional supplier of mora-level timing for an utterance
/// (a VOICEVOX-style audio query, one entry per accent phrase).
pub trait PhonemeSource: Send + Sync {
    fn accent_phrases(
        &self,
        text: String,
    ) -> PortFuture<Result<Vec<AccentPhrase>, PhonemeSourceError>>;
}
