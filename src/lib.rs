//! Tag parsing, markup repair and playback timing for a talking animated
//! character. Takes LLM output with ad-hoc emotion markup, recovers
//! well-formed structure from it, and drives synchronized speech playback
//! and facial-expression switches through injected ports.

pub mod config;
pub mod controller;
pub mod error;
pub mod label;
pub mod logging;
pub mod markup;
pub mod playback;
pub mod ports;
pub mod timeline;

pub use controller::Controller;
pub use error::{PhonemeSourceError, PlaybackError};
pub use label::ExpressionLabel;
pub use markup::{parse, sanitize, strip_tags, Segment};
pub use playback::{
    CancelToken, PlaybackOrchestrator, PlaybackRequest, PlaybackResult, PlaybackState,
};
pub use ports::{ExpressionActuator, PhonemeSource, SpeechHint, SpeechSynthesizer};
pub use timeline::{
    extract_phonemes, map_to_timeline, map_with_fixed_rate, AccentPhrase, Mora, Phoneme,
    TimedSegment,
};
