// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Typed analyzer result contracts
//!
//! Every analyzer capability returns an explicit named-field type so the
//! pipeline can validate complete stage output mechanically; no free-form
//! maps cross the port boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw audio features measured by the feature-extraction collaborator
///
/// These are measurements, not judgements; classification into bands is the
/// job of [`crate::analysis::policy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAudioFeatures {
    pub duration_secs: f32,
    /// Standard deviation of the pitch track in Hz
    pub pitch_stddev_hz: f32,
    /// Mean RMS level in dBFS
    pub mean_rms_db: f32,
    /// Longest detected silence interval in seconds
    pub longest_pause_secs: f32,
    /// Compound sentiment score of the transcript, -1.0..=1.0
    pub sentiment_score: f32,
    /// Recognizer confidence for the transcript, when available
    pub clarity_confidence: Option<f32>,
}

/// Raw video features measured by the feature-extraction collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVideoFeatures {
    /// Frames actually inspected (the extractor samples, it does not decode
    /// every frame)
    pub frames_sampled: u32,
    /// Sampled frames in which a hand gesture was detected
    pub gesture_frames: u32,
    /// Mean face-detection confidence over sampled frames, 0.0..=1.0
    pub mean_face_confidence: f32,
}

macro_rules! display_as {
    ($ty:ident { $($variant:ident => $text:expr),+ $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let text = match self {
                    $( $ty::$variant => $text, )+
                };
                write!(f, "{}", text)
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fluency {
    Fluent,
    NotFluent,
}
display_as!(Fluency { Fluent => "Fluent", NotFluent => "Not Fluent" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaceBand {
    Slow,
    Moderate,
    Fast,
}
display_as!(PaceBand { Slow => "Slow pace", Moderate => "Moderate pace", Fast => "Fast pace" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PitchVariation {
    High,
    Low,
}
display_as!(PitchVariation { High => "High variations", Low => "Low variations" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Emphasis {
    Effective,
    Lacking,
}
display_as!(Emphasis { Effective => "Effective emphasis", Lacking => "Lacks emphasis" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tone {
    Positive,
    Neutral,
    Negative,
}
display_as!(Tone { Positive => "Positive tone", Neutral => "Neutral tone", Negative => "Negative tone" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Clarity {
    High,
    Moderate,
    Low,
    Unavailable,
}
display_as!(Clarity {
    High => "High clarity",
    Moderate => "Moderate clarity",
    Low => "Low clarity",
    Unavailable => "Unable to analyze clarity",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeEnergy {
    High,
    Moderate,
    Low,
}
display_as!(VolumeEnergy {
    High => "High volume and energy",
    Moderate => "Moderate volume and energy",
    Low => "Low volume and energy",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostureBand {
    Good,
    Average,
    Bad,
}
display_as!(PostureBand { Good => "Good", Average => "Average", Bad => "Bad" });

/// Classified audio metrics for one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioMetrics {
    pub speech_rate_wpm: f32,
    pub fluency: Fluency,
    pub longest_pause_secs: f32,
    pub pitch_variation: PitchVariation,
    pub word_emphasis: Emphasis,
    pub tone: Tone,
    pub pace: PaceBand,
    pub clarity: Clarity,
    pub volume_energy: VolumeEnergy,
}

/// Classified video metrics for one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetrics {
    /// Mean face-detection confidence as a whole percentage
    pub facial_expression_pct: u32,
    /// Gesture frequency scaled to a 0..=10 rating
    pub gesture_rating: f32,
    pub posture: PostureBand,
    /// Overall performance summary line
    pub overall: String,
}

/// Combined output of the three pipeline branches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub video_metrics: VideoMetrics,
    pub audio_metrics: AudioMetrics,
    pub ai_narrative: String,
}
