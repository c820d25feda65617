//! Maps character-offset segments onto the audio timeline.

pub mod phoneme;

pub use phoneme::{extract_phonemes, AccentPhrase, Mora, Phoneme};

use crate::label::ExpressionLabel;
use crate::markup::Segment;

/// Assumed total duration when the phoneme list is empty; keeps the
/// offset-to-time ratio finite.
const EMPTY_PHONEME_TOTAL_SECS: f64 = 1.0;
/// Ratio used when the clean text itself is empty.
const EMPTY_TEXT_RATIO: f64 = 0.1;

/// A segment placed on the audio timeline, with the phonemes whose
/// intervals intersect its own.
#[derive(Clone, Debug, PartialEq)]
pub struct TimedSegment {
    pub text: String,
    pub label: ExpressionLabel,
    pub start_offset: usize,
    pub end_offset: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub phonemes: Vec<Phoneme>,
}

/// Phoneme-driven mapping: character offsets scale linearly onto the span
/// covered by `phonemes`. Start times come out monotonically non-decreasing
/// because offsets are ascending.
pub fn map_to_timeline(
    segments: &[Segment],
    clean_text: &str,
    phonemes: &[Phoneme],
) -> Vec<TimedSegment> {
    let total = phonemes
        .last()
        .map(|p| p.end_time)
        .unwrap_or(EMPTY_PHONEME_TOTAL_SECS);
    let chars = clean_text.chars().count();
    let ratio = if chars > 0 {
        total / chars as f64
    } else {
        EMPTY_TEXT_RATIO
    };
    segments
        .iter()
        .map(|segment| {
            let start_time = segment.start_offset as f64 * ratio;
            let end_time = segment.end_offset as f64 * ratio;
            let related = phonemes
                .iter()
                .filter(|p| p.start_time < end_time && p.end_time > start_time)
                .cloned()
                .collect();
            timed(segment, start_time, end_time, related)
        })
        .collect()
}

/// Fallback mapping when no phoneme source is available: a fixed duration
/// per character, no phoneme attachment.
pub fn map_with_fixed_rate(segments: &[Segment], secs_per_char: f64) -> Vec<TimedSegment> {
    segments
        .iter()
        .map(|segment| {
            timed(
                segment,
                segment.start_offset as f64 * secs_per_char,
                segment.end_offset as f64 * secs_per_char,
                Vec::new(),
            )
        })
        .collect()
}

fn timed(segment: &Segment, start_time: f64, end_time: f64, phonemes: Vec<Phoneme>) -> TimedSegment {
    TimedSegment {
        text: segment.text.clone(),
        label: segment.label,
        start_offset: segment.start_offset,
        end_offset: segment.end_offset,
        start_time,
        end_time,
        phonemes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn phoneme(symbol: &str, start: f64, end: f64) -> Phoneme {
        Phoneme {
            symbol: symbol.into(),
            start_time: start,
            end_time: end,
        }
    }

    #[test]
    fn empty_everything_yields_empty_without_panic() {
        assert!(map_to_timeline(&[], "", &[]).is_empty());
    }

    #[test]
    fn offsets_scale_by_total_duration() {
        let (segments, clean) = parse(
            "<happy>ああ</happy><sad>いい</sad>",
            ExpressionLabel::Neutral,
        );
        let phonemes = vec![phoneme("a", 0.0, 1.0), phoneme("i", 1.0, 2.0)];
        let timed = map_to_timeline(&segments, &clean, &phonemes);
        // 4 chars over 2.0s -> 0.5s per char
        assert!(approx(timed[0].start_time, 0.0));
        assert!(approx(timed[0].end_time, 1.0));
        assert!(approx(timed[1].start_time, 1.0));
        assert!(approx(timed[1].end_time, 2.0));
    }

    #[test]
    fn attaches_only_overlapping_phonemes() {
        let (segments, clean) = parse(
            "<happy>ああ</happy><sad>いい</sad>",
            ExpressionLabel::Neutral,
        );
        let phonemes = vec![
            phoneme("a", 0.0, 0.9),
            phoneme("x", 0.9, 1.1),
            phoneme("i", 1.1, 2.0),
        ];
        let timed = map_to_timeline(&segments, &clean, &phonemes);
        let first: Vec<&str> = timed[0].phonemes.iter().map(|p| p.symbol.as_str()).collect();
        let second: Vec<&str> = timed[1].phonemes.iter().map(|p| p.symbol.as_str()).collect();
        // "x" straddles the 1.0s boundary and lands in both
        assert_eq!(first, vec!["a", "x"]);
        assert_eq!(second, vec!["x", "i"]);
    }

    #[test]
    fn start_times_are_monotonic() {
        let (segments, clean) = parse(
            "前<happy>中</happy>後<sad>奥</sad>",
            ExpressionLabel::Neutral,
        );
        let phonemes = vec![phoneme("a", 0.0, 1.3)];
        let timed = map_to_timeline(&segments, &clean, &phonemes);
        for pair in timed.windows(2) {
            assert!(pair[0].start_time <= pair[1].start_time);
        }
    }

    #[test]
    fn empty_phoneme_list_uses_constant_total() {
        let (segments, clean) = parse("<happy>ああ</happy>", ExpressionLabel::Neutral);
        let timed = map_to_timeline(&segments, &clean, &[]);
        // 2 chars over the 1.0s fallback total
        assert!(approx(timed[0].end_time, 1.0));
        assert!(timed[0].phonemes.is_empty());
    }

    #[test]
    fn fixed_rate_fallback_uses_per_char_duration() {
        let (segments, _) = parse(
            "<happy>ああ</happy><sad>いい</sad>",
            ExpressionLabel::Neutral,
        );
        let timed = map_with_fixed_rate(&segments, 0.15);
        assert!(approx(timed[0].start_time, 0.0));
        assert!(approx(timed[0].end_time, 0.3));
        assert!(approx(timed[1].start_time, 0.3));
        assert!(approx(timed[1].end_time, 0.6));
        assert!(timed.iter().all(|t| t.phonemes.is_empty()));
    }
}
