//! Tone presets for generated cover letters.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Professional,
    Enthusiastic,
    Concise,
}

/// Phrasing guidance handed to the model for a given tone.
#[derive(Debug, Clone)]
pub struct ToneGuide {
    pub description: &'static str,
    pub target_words: (u32, u32),
    pub avoid: &'static [&'static str],
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Enthusiastic => "enthusiastic",
            Tone::Concise => "concise",
        }
    }

    pub fn guide(&self) -> ToneGuide {
        match self {
            Tone::Professional => ToneGuide {
                description: "measured and confident, focused on relevant experience",
                target_words: (250, 350),
                avoid: &["passionate", "rockstar", "ninja", "dream job"],
            },
            Tone::Enthusiastic => ToneGuide {
                description: "warm and energetic, showing genuine interest in the company's product",
                target_words: (250, 350),
                avoid: &["to whom it may concern", "rockstar", "ninja"],
            },
            Tone::Concise => ToneGuide {
                description: "direct, three short paragraphs, no filler",
                target_words: (120, 180),
                avoid: &["I am writing to", "to whom it may concern", "passionate"],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tone_is_professional() {
        assert_eq!(Tone::default(), Tone::Professional);
    }

    #[test]
    fn test_concise_is_shorter() {
        let concise = Tone::Concise.guide().target_words;
        let professional = Tone::Professional.guide().target_words;
        assert!(concise.1 < professional.0);
    }

    #[test]
    fn test_tone_deserializes_snake_case() {
        let tone: Tone = serde_json::from_str("\"enthusiastic\"").unwrap();
        assert_eq!(tone, Tone::Enthusiastic);
    }
}
