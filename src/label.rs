//! The closed set of expression labels the animation server can show.
//! Everything outside this set is either denylisted or stripped before
//! parsing; downstream code never sees a free-form label string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionLabel {
    #[default]
    Neutral,
    Happy,
    Sad,
    Angry,
    Surprised,
    Crying,
    Hurt,
    Wink,
    Mouth3,
    Pien,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown expression label: {0}")]
pub struct UnknownLabel(pub String);

impl ExpressionLabel {
    pub const ALL: [ExpressionLabel; 10] = [
        ExpressionLabel::Neutral,
        ExpressionLabel::Happy,
        ExpressionLabel::Sad,
        ExpressionLabel::Angry,
        ExpressionLabel::Surprised,
        ExpressionLabel::Crying,
        ExpressionLabel::Hurt,
        ExpressionLabel::Wink,
        ExpressionLabel::Mouth3,
        ExpressionLabel::Pien,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExpressionLabel::Neutral => "neutral",
            ExpressionLabel::Happy => "happy",
            ExpressionLabel::Sad => "sad",
            ExpressionLabel::Angry => "angry",
            ExpressionLabel::Surprised => "surprised",
            ExpressionLabel::Crying => "crying",
            ExpressionLabel::Hurt => "hurt",
            ExpressionLabel::Wink => "wink",
            ExpressionLabel::Mouth3 => "mouth3",
            ExpressionLabel::Pien => "pien",
        }
    }
}

impl fmt::Display for ExpressionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpressionLabel {
    type Err = UnknownLabel;

    /// Tag names in LLM output arrive in any casing; matching is
    /// ASCII-case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_label_case_insensitively() {
        for label in ExpressionLabel::ALL {
            assert_eq!(label.as_str().parse::<ExpressionLabel>(), Ok(label));
            assert_eq!(
                label.as_str().to_ascii_uppercase().parse::<ExpressionLabel>(),
                Ok(label)
            );
        }
        assert_eq!("Happy".parse::<ExpressionLabel>(), Ok(ExpressionLabel::Happy));
    }

    #[test]
    fn rejects_unknown_and_denylisted_names() {
        assert_eq!(
            "thinking".parse::<ExpressionLabel>(),
            Err(UnknownLabel("thinking".to_string()))
        );
        assert!("".parse::<ExpressionLabel>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&ExpressionLabel::Mouth3).unwrap();
        assert_eq!(json, "\"mouth3\"");
        let back: ExpressionLabel = serde_json::from_str("\"pien\"").unwrap();
        assert_eq!(back, ExpressionLabel::Pien);
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(ExpressionLabel::Surprised.to_string(), "surprised");
        assert_eq!(ExpressionLabel::default(), ExpressionLabel::Neutral);
    }
}
