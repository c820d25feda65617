//! Phoneme timing extracted from a mora-based prosody source
//! (VOICEVOX-style audio query, one `AccentPhrase` per phrase).

use serde::Deserialize;

/// One phoneme on the audio timeline, times in seconds from utterance start.
#[derive(Clone, Debug, PartialEq)]
pub struct Phoneme {
    pub symbol: String,
    pub start_time: f64,
    pub end_time: f64,
}

/// A mora: optional consonant plus vowel, each with a duration.
/// Field names mirror the audio query JSON so this deserializes directly.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Mora {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub consonant: Option<String>,
    #[serde(default)]
    pub consonant_length: Option<f64>,
    #[serde(default)]
    pub vowel: Option<String>,
    #[serde(default)]
    pub vowel_length: f64,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AccentPhrase {
    #[serde(default)]
    pub moras: Vec<Mora>,
    #[serde(default)]
    pub pause_mora: Option<Mora>,
}

/// Flattens accent phrases into a phoneme sequence over one running clock.
/// The clock never resets between phrases; a non-zero trailing pause is
/// appended as a `pau` phoneme.
pub fn extract_phonemes(phrases: &[AccentPhrase]) -> Vec<Phoneme> {
    let mut phonemes = Vec::new();
    let mut clock = 0.0;
    for phrase in phrases {
        for mora in &phrase.moras {
            if let Some(consonant) = mora.consonant.as_deref().filter(|c| !c.is_empty()) {
                let length = mora.consonant_length.unwrap_or(0.0);
                phonemes.push(Phoneme {
                    symbol: consonant.to_string(),
                    start_time: clock,
                    end_time: clock + length,
                });
                clock += length;
            }
            if let Some(vowel) = mora.vowel.as_deref().filter(|v| !v.is_empty()) {
                phonemes.push(Phoneme {
                    symbol: vowel.to_string(),
                    start_time: clock,
                    end_time: clock + mora.vowel_length,
                });
                clock += mora.vowel_length;
            }
        }
        if let Some(pause) = &phrase.pause_mora {
            if pause.vowel_length > 0.0 {
                phonemes.push(Phoneme {
                    symbol: "pau".to_string(),
                    start_time: clock,
                    end_time: clock + pause.vowel_length,
                });
                clock += pause.vowel_length;
            }
        }
    }
    phonemes
}
