use std::fmt;

use serde::{Serialize, Serializer};

use crate::errors::{EmotionError, Result};

/// Number of classes the classifier emits.
pub const EMOTION_COUNT: usize = 7;

/// Secondary labels must score strictly above this to be reported.
pub const CONFIDENCE_THRESHOLD: f32 = 0.05;

/// Closed set of classifier outputs.
///
/// Declaration order is the model's output index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EmotionLabel {
    Angry,
    Disgust,
    Fear,
    Happy,
    Neutral,
    Sad,
    Surprise,
}

impl EmotionLabel {
    pub const ALL: [Self; EMOTION_COUNT] = [
        Self::Angry,
        Self::Disgust,
        Self::Fear,
        Self::Happy,
        Self::Neutral,
        Self::Sad,
        Self::Surprise,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Angry => "angry",
            Self::Disgust => "disgust",
            Self::Fear => "fear",
            Self::Happy => "happy",
            Self::Neutral => "neutral",
            Self::Sad => "sad",
            Self::Surprise => "surprise",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Happy => {
                "A positive emotional state characterized by joy, contentment, and satisfaction."
            }
            Self::Sad => {
                "A negative emotional state often associated with feelings of loss, disappointment, or sorrow."
            }
            Self::Angry => {
                "An intense emotional state triggered by frustration, threat, or perceived injustice."
            }
            Self::Surprise => "A brief emotional response to unexpected or novel stimuli.",
            Self::Neutral => {
                "A balanced emotional state without strong positive or negative feelings."
            }
            Self::Fear => {
                "An emotional response to perceived danger or threat, activating fight-or-flight responses."
            }
            Self::Disgust => {
                "An emotional response to something offensive, unpleasant, or morally reprehensible."
            }
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EmotionLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One probability per label, index-aligned with [`EmotionLabel::ALL`].
///
/// Every value lies in `[0, 1]`; they are not required to sum to exactly 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbabilityVector([f32; EMOTION_COUNT]);

impl ProbabilityVector {
    pub fn new(values: [f32; EMOTION_COUNT]) -> Result<Self> {
        // NaN fails the range check too
        if let Some(bad) = values.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(EmotionError::inference(
                "probability validation",
                format!("probability {bad} outside [0, 1]"),
            ));
        }
        Ok(Self(values))
    }

    pub fn from_slice(values: &[f32]) -> Result<Self> {
        let values: [f32; EMOTION_COUNT] = values.try_into().map_err(|_| {
            EmotionError::inference(
                "probability validation",
                format!("expected {EMOTION_COUNT} values, got {}", values.len()),
            )
        })?;
        Self::new(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (EmotionLabel, f32)> + '_ {
        EmotionLabel::ALL.into_iter().zip(self.0.iter().copied())
    }
}

/// A single reported label. Built once and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmotionResult {
    pub emotion: EmotionLabel,
    pub confidence: f32,
    pub description: &'static str,
}

impl EmotionResult {
    pub const fn new(emotion: EmotionLabel, confidence: f32) -> Self {
        Self {
            emotion,
            confidence,
            description: emotion.description(),
        }
    }
}

/// Results ordered by descending confidence, top label first.
pub type ResultSet = Vec<EmotionResult>;

/// Where a result set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Model,
    Fallback,
}

/// A result set tagged with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub source: ResultSource,
    pub results: ResultSet,
}

impl Analysis {
    pub fn is_fallback(&self) -> bool {
        self.source == ResultSource::Fallback
    }

    pub fn top(&self) -> Option<&EmotionResult> {
        self.results.first()
    }
}
