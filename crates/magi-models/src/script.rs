//! Script and segment models.
//!
//! A `Script` is the parsed output of the language model: an ordered list
//! of narration/visual-description pairs plus the request parameters that
//! produced it. Segment order is playback order and is never reordered.

use serde::{Deserialize, Serialize};

/// Target audience sophistication for script generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SophisticationLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl SophisticationLevel {
    /// Parse a 1-3 level as accepted by the API.
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Beginner),
            2 => Some(Self::Intermediate),
            3 => Some(Self::Advanced),
            _ => None,
        }
    }

    /// Numeric level as exposed by the API.
    pub fn as_level(&self) -> u8 {
        match self {
            Self::Beginner => 1,
            Self::Intermediate => 2,
            Self::Advanced => 3,
        }
    }

    /// Audience description interpolated into generation prompts.
    pub fn audience_description(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner-friendly, using simple language and basic concepts",
            Self::Intermediate => "intermediate level, assuming basic knowledge of the subject",
            Self::Advanced => {
                "advanced level, using sophisticated concepts and terminology appropriate for advanced students"
            }
        }
    }
}

impl Default for SophisticationLevel {
    fn default() -> Self {
        Self::Intermediate
    }
}

/// One narration + visual-description unit. Corresponds to one rendered scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Spoken narration text for this scene
    pub narration: String,
    /// Prose description of what should appear on screen
    pub scene_description: String,
}

impl Segment {
    pub fn new(narration: impl Into<String>, scene_description: impl Into<String>) -> Self {
        Self {
            narration: narration.into(),
            scene_description: scene_description.into(),
        }
    }

    /// Whitespace-delimited word count of the narration.
    pub fn word_count(&self) -> usize {
        self.narration.split_whitespace().count()
    }
}

/// A complete generated script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    /// Topic (or problem statement) the script was generated for
    pub topic: String,
    /// Requested video length in minutes
    pub duration_minutes: u32,
    /// Audience sophistication the narration targets
    pub level: SophisticationLevel,
    /// Ordered segments; index is the scene index
    pub segments: Vec<Segment>,
}

impl Script {
    pub fn new(
        topic: impl Into<String>,
        duration_minutes: u32,
        level: SophisticationLevel,
        segments: Vec<Segment>,
    ) -> Self {
        Self {
            topic: topic.into(),
            duration_minutes,
            level,
            segments,
        }
    }

    /// Number of scenes in the script.
    pub fn scene_count(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total narration word count across all segments.
    pub fn total_words(&self) -> usize {
        self.segments.iter().map(Segment::word_count).sum()
    }
}
