//! Per-utterance pipeline: repair the markup, parse it, place the
//! segments on the audio timeline and run one playback.

use std::sync::Arc;

use log::{info, warn};

use crate::config;
use crate::label::ExpressionLabel;
use crate::markup;
use crate::playback::{CancelToken, PlaybackOrchestrator, PlaybackRequest, PlaybackResult};
use crate::ports::{ExpressionActuator, PhonemeSource, SpeechSynthesizer};
use crate::timeline::{self, TimedSegment};

pub struct Controller {
    actuator: Arc<dyn ExpressionActuator>,
    speech: Arc<dyn SpeechSynthesizer>,
    phonemes: Option<Arc<dyn PhonemeSource>>,
}

impl Controller {
    pub fn new(actuator: Arc<dyn ExpressionActuator>, speech: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            actuator,
            speech,
            phonemes: None,
        }
    }

    /// Attaches a mora-timing source; without one the fixed per-character
    /// rate is used.
    pub fn with_phoneme_source(mut self, source: Arc<dyn PhonemeSource>) -> Self {
        self.phonemes = Some(source);
        self
    }

    /// Speaks one tagged utterance with synchronized expression switches.
    pub async fn speak(
        &self,
        tagged_text: &str,
        base_label: ExpressionLabel,
    ) -> PlaybackResult {
        self.speak_with_cancel(tagged_text, base_label, CancelToken::new())
            .await
    }

    /// Like `speak`, but cancellable from outside through `cancel`.
    pub async fn speak_with_cancel(
        &self,
        tagged_text: &str,
        base_label: ExpressionLabel,
        cancel: CancelToken,
    ) -> PlaybackResult {
        let sanitized = markup::sanitize(tagged_text);
        let (segments, clean_text) = markup::parse(&sanitized, ExpressionLabel::Neutral);

        info!("expression segments: {}", segments.len());
        for segment in &segments {
            info!("  {:?} -> {}", segment.text, segment.label);
        }

        let timed = self.place_on_timeline(&segments, &clean_text).await;

        if let Some(hint) = self.speech.prepare(clean_text.clone()).await {
            info!("speech duration hint: {:.2}s", hint.duration_secs);
        }

        let mut orchestrator =
            PlaybackOrchestrator::new(self.actuator.clone(), self.speech.clone())
                .with_cancel_token(cancel);
        orchestrator
            .run(PlaybackRequest {
                clean_text,
                segments: timed,
                base_label,
            })
            .await
    }

    async fn place_on_timeline(
        &self,
        segments: &[markup::Segment],
        clean_text: &str,
    ) -> Vec<TimedSegment> {
        let fallback_rate = config::timing_config().fallback_char_secs;
        let source = match &self.phonemes {
            Some(source) if !clean_text.is_empty() => source,
            _ => return timeline::map_with_fixed_rate(segments, fallback_rate),
        };
        match source.accent_phrases(clean_text.to_string()).await {
            Ok(phrases) => {
                let phonemes = timeline::extract_phonemes(&phrases);
                timeline::map_to_timeline(segments, clean_text, &phonemes)
            }
            Err(err) => {
                warn!("phoneme source failed, using fixed rate: {}", err);
                timeline::map_with_fixed_rate(segments, fallback_rate)
            }
        }
    }
}
