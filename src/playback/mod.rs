//! Playback orchestration: one utterance, two time-coupled activities.
//!
//! The speech activity hands the clean text to the synthesizer and awaits
//! completion; the schedule activity walks the timed segments and switches
//! expressions as their start times come due. Both run as tokio tasks
//! joined here, share one cancellation token, and each collaborator sees
//! at most one outstanding call from this module at a time.

pub mod cancel;

pub use cancel::CancelToken;

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::time::Instant;

use crate::config;
use crate::error::PlaybackError;
use crate::label::ExpressionLabel;
use crate::ports::{ExpressionActuator, SpeechSynthesizer};
use crate::timeline::TimedSegment;

/// Sole input of the orchestrator.
#[derive(Clone, Debug)]
pub struct PlaybackRequest {
    pub clean_text: String,
    pub segments: Vec<TimedSegment>,
    /// Expression the character holds before and after the utterance.
    pub base_label: ExpressionLabel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackResult {
    pub success: bool,
    pub error: Option<PlaybackError>,
}

impl PlaybackResult {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn failed(error: PlaybackError) -> Self {
        Self {
            success: false,
            error: Some(error),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Preparing,
    Playing,
    Done,
    Cancelled,
    Failed,
}

/// Created per utterance and discarded afterwards; all mutable playback
/// state lives here.
pub struct PlaybackOrchestrator {
    actuator: Arc<dyn ExpressionActuator>,
    speech: Arc<dyn SpeechSynthesizer>,
    deadline: Duration,
    cancel: CancelToken,
    state: PlaybackState,
}

impl PlaybackOrchestrator {
    pub fn new(actuator: Arc<dyn ExpressionActuator>, speech: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            actuator,
            speech,
            deadline: config::timing_config().playback_deadline,
            cancel: CancelToken::new(),
            state: PlaybackState::Idle,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Replaces the internally created token, letting a caller wire the
    /// same token into several runs or hold it before `run` starts.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token for cancelling the run from outside (e.g. barge-in).
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub async fn run(&mut self, request: PlaybackRequest) -> PlaybackResult {
        self.state = PlaybackState::Preparing;
        if let Err(error) = validate(&request) {
            self.state = PlaybackState::Failed;
            return PlaybackResult::failed(error);
        }

        // reset to the base expression before any audio starts
        if !self.actuator.set_expression(request.base_label).await {
            warn!("base expression reset failed: {}", request.base_label);
        }

        self.state = PlaybackState::Playing;

        let mut speech_handle = {
            let speech = self.speech.clone();
            let cancel = self.cancel.clone();
            let text = request.clean_text.clone();
            tokio::spawn(async move {
                tokio::select! {
                    ok = speech.speak(text) => Some(ok),
                    _ = cancel.cancelled() => None,
                }
            })
        };
        let mut schedule_handle = tokio::spawn(run_schedule(
            self.actuator.clone(),
            self.cancel.clone(),
            request.segments.clone(),
            request.base_label,
        ));

        let joined = tokio::time::timeout(self.deadline, async {
            tokio::join!(&mut speech_handle, &mut schedule_handle)
        })
        .await;

        match joined {
            Err(_) => {
                // deadline exceeded: stop both activities without awaiting
                // their in-flight calls any further
                self.cancel.cancel();
                speech_handle.abort();
                schedule_handle.abort();
                self.revert_to_base(request.base_label).await;
                self.state = PlaybackState::Failed;
                PlaybackResult::failed(PlaybackError::Timeout)
            }
            Ok((speech_res, schedule_res)) => {
                // a panicked task counts as a failed activity
                let speech_outcome = speech_res.unwrap_or(Some(false));
                let schedule_completed = schedule_res.unwrap_or(false);

                if self.cancel.is_cancelled() {
                    self.revert_to_base(request.base_label).await;
                    self.state = PlaybackState::Cancelled;
                    return PlaybackResult::failed(PlaybackError::Cancelled);
                }
                match speech_outcome {
                    Some(true) if schedule_completed => {
                        self.state = PlaybackState::Done;
                        PlaybackResult::ok()
                    }
                    Some(true) => {
                        // schedule stops early only on cancellation
                        self.state = PlaybackState::Cancelled;
                        PlaybackResult::failed(PlaybackError::Cancelled)
                    }
                    _ => {
                        self.state = PlaybackState::Failed;
                        PlaybackResult::failed(PlaybackError::Synthesis)
                    }
                }
            }
        }
    }

    async fn revert_to_base(&self, base_label: ExpressionLabel) {
        if !self.actuator.set_expression(base_label).await {
            warn!("best-effort base revert failed: {}", base_label);
        }
    }
}

fn validate(request: &PlaybackRequest) -> Result<(), PlaybackError> {
    let mut previous = 0.0f64;
    for segment in &request.segments {
        if !segment.start_time.is_finite() || !segment.end_time.is_finite() {
            return Err(PlaybackError::InvalidRequest("non-finite segment time"));
        }
        if segment.start_time < 0.0 {
            return Err(PlaybackError::InvalidRequest("negative start time"));
        }
        if segment.end_time < segment.start_time {
            return Err(PlaybackError::InvalidRequest("segment ends before it starts"));
        }
        if segment.start_time < previous {
            return Err(PlaybackError::InvalidRequest(
                "start times must be non-decreasing",
            ));
        }
        previous = segment.start_time;
    }
    Ok(())
}

/// Walks segments in order, sleeping until each start time and switching
/// the expression when it differs from the one currently shown. Failed
/// switches keep the tracked label, so the next differing segment retries.
/// Returns false when cancelled.
async fn run_schedule(
    actuator: Arc<dyn ExpressionActuator>,
    cancel: CancelToken,
    segments: Vec<TimedSegment>,
    base_label: ExpressionLabel,
) -> bool {
    let started = Instant::now();
    let mut current = base_label;
    for segment in &segments {
        let target = started + Duration::from_secs_f64(segment.start_time);
        tokio::select! {
            _ = tokio::time::sleep_until(target) => {}
            _ = cancel.cancelled() => return false,
        }
        if cancel.is_cancelled() {
            return false;
        }
        if segment.label != current {
            if actuator.set_expression(segment.label).await {
                info!(
                    "expression switch: {} at {:.2}s",
                    segment.label, segment.start_time
                );
                current = segment.label;
            } else {
                warn!("expression switch failed: {}", segment.label);
            }
        }
    }
    // hold the last expression through the segment, then hand back
    if current != base_label && !actuator.set_expression(base_label).await {
        warn!("revert to base expression failed: {}", base_label);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    use crate::ports::PortFuture;

    struct RecordingActuator {
        calls: Mutex<Vec<ExpressionLabel>>,
        fail_on: HashSet<ExpressionLabel>,
    }

    impl RecordingActuator {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_on: HashSet::new(),
            }
        }

        fn failing_on(label: ExpressionLabel) -> Self {
            let mut fail_on = HashSet::new();
            fail_on.insert(label);
            Self {
                calls: Mutex::new(Vec::new()),
                fail_on,
            }
        }

        fn calls(&self) -> Vec<ExpressionLabel> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ExpressionActuator for RecordingActuator {
        fn set_expression(&self, label: ExpressionLabel) -> PortFuture<bool> {
            self.calls.lock().unwrap().push(label);
            let ok = !self.fail_on.contains(&label);
            Box::pin(async move { ok })
        }
    }

    struct DummySpeech {
        result: bool,
        delay: Duration,
    }

    impl DummySpeech {
        fn instant(result: bool) -> Self {
            Self {
                result,
                delay: Duration::ZERO,
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                result: true,
                delay,
            }
        }
    }

    impl crate::ports::SpeechSynthesizer for DummySpeech {
        fn speak(&self, _text: String) -> PortFuture<bool> {
            let result = self.result;
            let delay = self.delay;
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                result
            })
        }
    }

    fn segment(label: ExpressionLabel, start: f64) -> TimedSegment {
        TimedSegment {
            text: "x".into(),
            label,
            start_offset: 0,
            end_offset: 1,
            start_time: start,
            end_time: start + 0.1,
            phonemes: Vec::new(),
        }
    }

    fn request(segments: Vec<TimedSegment>) -> PlaybackRequest {
        PlaybackRequest {
            clean_text: "テスト".into(),
            segments,
            base_label: ExpressionLabel::Neutral,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn redundant_switches_are_suppressed() {
        let actuator = Arc::new(RecordingActuator::new());
        let speech = Arc::new(DummySpeech::instant(true));
        let mut orchestrator = PlaybackOrchestrator::new(actuator.clone(), speech);
        let result = orchestrator
            .run(request(vec![
                segment(ExpressionLabel::Happy, 0.0),
                segment(ExpressionLabel::Happy, 0.05),
                segment(ExpressionLabel::Sad, 0.1),
            ]))
            .await;
        assert!(result.success);
        assert_eq!(orchestrator.state(), PlaybackState::Done);
        // base reset, happy once (not twice), sad, revert to base
        assert_eq!(
            actuator.calls(),
            vec![
                ExpressionLabel::Neutral,
                ExpressionLabel::Happy,
                ExpressionLabel::Sad,
                ExpressionLabel::Neutral,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_switch_is_retried_on_next_differing_segment() {
        let actuator = Arc::new(RecordingActuator::failing_on(ExpressionLabel::Happy));
        let speech = Arc::new(DummySpeech::instant(true));
        let mut orchestrator = PlaybackOrchestrator::new(actuator.clone(), speech);
        let result = orchestrator
            .run(request(vec![
                segment(ExpressionLabel::Happy, 0.0),
                segment(ExpressionLabel::Happy, 0.05),
            ]))
            .await;
        // actuator failure never fails the run
        assert!(result.success);
        // tracked label stayed neutral, so the second happy segment retried;
        // final revert is suppressed because neutral is still shown
        assert_eq!(
            actuator.calls(),
            vec![
                ExpressionLabel::Neutral,
                ExpressionLabel::Happy,
                ExpressionLabel::Happy,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn synthesis_failure_is_surfaced() {
        let actuator = Arc::new(RecordingActuator::new());
        let speech = Arc::new(DummySpeech::instant(false));
        let mut orchestrator = PlaybackOrchestrator::new(actuator, speech);
        let result = orchestrator
            .run(request(vec![segment(ExpressionLabel::Happy, 0.0)]))
            .await;
        assert!(!result.success);
        assert_eq!(result.error, Some(PlaybackError::Synthesis));
        assert_eq!(orchestrator.state(), PlaybackState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_cancels_both_activities() {
        let actuator = Arc::new(RecordingActuator::new());
        let speech = Arc::new(DummySpeech::slow(Duration::from_secs(600)));
        let mut orchestrator = PlaybackOrchestrator::new(actuator.clone(), speech)
            .with_deadline(Duration::from_millis(100));
        let started = Instant::now();
        let result = orchestrator
            .run(request(vec![segment(ExpressionLabel::Happy, 500.0)]))
            .await;
        assert!(!result.success);
        assert_eq!(result.error, Some(PlaybackError::Timeout));
        assert_eq!(orchestrator.state(), PlaybackState::Failed);
        // unwound at the deadline, not after the 500s segment sleep
        assert!(started.elapsed() < Duration::from_secs(1));
        // best-effort revert still happened
        assert_eq!(actuator.calls().last(), Some(&ExpressionLabel::Neutral));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_is_observed_during_a_long_sleep() {
        let actuator = Arc::new(RecordingActuator::new());
        let speech = Arc::new(DummySpeech::slow(Duration::from_secs(600)));
        let mut orchestrator = PlaybackOrchestrator::new(actuator.clone(), speech);
        let token = orchestrator.cancel_token();
        let started = Instant::now();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });
        let result = orchestrator
            .run(request(vec![segment(ExpressionLabel::Happy, 500.0)]))
            .await;
        assert!(!result.success);
        assert_eq!(result.error, Some(PlaybackError::Cancelled));
        assert_eq!(orchestrator.state(), PlaybackState::Cancelled);
        // the 500s sleep did not run to completion
        assert!(started.elapsed() < Duration::from_secs(1));
        // happy never fired; the run still handed back the base expression
        assert!(!actuator.calls().contains(&ExpressionLabel::Happy));
        assert_eq!(actuator.calls().last(), Some(&ExpressionLabel::Neutral));
    }

    #[tokio::test]
    async fn non_monotonic_start_times_are_rejected() {
        let actuator = Arc::new(RecordingActuator::new());
        let speech = Arc::new(DummySpeech::instant(true));
        let mut orchestrator = PlaybackOrchestrator::new(actuator.clone(), speech);
        let result = orchestrator
            .run(request(vec![
                segment(ExpressionLabel::Happy, 1.0),
                segment(ExpressionLabel::Sad, 0.5),
            ]))
            .await;
        assert!(!result.success);
        assert!(matches!(
            result.error,
            Some(PlaybackError::InvalidRequest(_))
        ));
        // rejected during Preparing: no actuator traffic at all
        assert!(actuator.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_segment_list_still_plays_speech() {
        let actuator = Arc::new(RecordingActuator::new());
        let speech = Arc::new(DummySpeech::instant(true));
        let mut orchestrator = PlaybackOrchestrator::new(actuator.clone(), speech);
        let result = orchestrator.run(request(Vec::new())).await;
        assert!(result.success);
        assert_eq!(actuator.calls(), vec![ExpressionLabel::Neutral]);
    }
}
