// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Metric Classification Policy
//!
//! The fixed thresholds that turn raw features into rated metrics. These are
//! configuration, not protocol: a deployment may tune any of them without
//! touching the pipeline.

use super::types::*;

/// Classification thresholds and keyword lists
#[derive(Debug, Clone)]
pub struct AnalysisPolicy {
    /// Transcript words that mark hesitation or stuttering
    pub stutter_keywords: Vec<String>,
    /// Transcript words that mark deliberate emphasis
    pub emphasis_keywords: Vec<String>,
    /// Below this words-per-second rate speech counts as slow
    pub slow_pace_wps: f32,
    /// Above this words-per-second rate speech counts as fast
    pub fast_pace_wps: f32,
    /// Pitch standard deviation (Hz) above which variation counts as high
    pub pitch_variation_hz: f32,
    /// Sentiment score at or above which tone is positive
    pub positive_tone_score: f32,
    /// Sentiment score at or below which tone is negative
    pub negative_tone_score: f32,
    /// Recognizer confidence above which clarity is high
    pub high_clarity_confidence: f32,
    /// Recognizer confidence above which clarity is moderate
    pub moderate_clarity_confidence: f32,
    /// Mean RMS (dBFS) above which volume counts as high
    pub high_volume_rms_db: f32,
    /// Mean RMS (dBFS) above which volume counts as moderate
    pub moderate_volume_rms_db: f32,
    /// Face confidence percentage at or above which posture is good
    pub good_posture_pct: u32,
    /// Face confidence percentage at or above which posture is average
    pub average_posture_pct: u32,
}

impl Default for AnalysisPolicy {
    fn default() -> Self {
        Self {
            stutter_keywords: vec![
                "stutter".to_string(),
                "stammer".to_string(),
                "hesitate".to_string(),
            ],
            emphasis_keywords: vec![
                "important".to_string(),
                "crucial".to_string(),
                "significant".to_string(),
            ],
            slow_pace_wps: 1.5,
            fast_pace_wps: 2.5,
            pitch_variation_hz: 50.0,
            positive_tone_score: 0.5,
            negative_tone_score: -0.5,
            high_clarity_confidence: 0.8,
            moderate_clarity_confidence: 0.6,
            high_volume_rms_db: -10.0,
            moderate_volume_rms_db: -20.0,
            good_posture_pct: 90,
            average_posture_pct: 75,
        }
    }
}

impl AnalysisPolicy {
    pub fn classify_fluency(&self, transcript: &str) -> Fluency {
        let lowered = transcript.to_lowercase();
        if self.stutter_keywords.iter().any(|k| lowered.contains(k)) {
            Fluency::NotFluent
        } else {
            Fluency::Fluent
        }
    }

    pub fn classify_emphasis(&self, transcript: &str) -> Emphasis {
        let lowered = transcript.to_lowercase();
        if self.emphasis_keywords.iter().any(|k| lowered.contains(k)) {
            Emphasis::Effective
        } else {
            Emphasis::Lacking
        }
    }

    pub fn classify_pace(&self, word_count: usize, duration_secs: f32) -> PaceBand {
        if duration_secs <= 0.0 {
            return PaceBand::Moderate;
        }
        let wps = word_count as f32 / duration_secs;
        if wps > self.fast_pace_wps {
            PaceBand::Fast
        } else if wps < self.slow_pace_wps {
            PaceBand::Slow
        } else {
            PaceBand::Moderate
        }
    }

    pub fn classify_pitch(&self, stddev_hz: f32) -> PitchVariation {
        if stddev_hz > self.pitch_variation_hz {
            PitchVariation::High
        } else {
            PitchVariation::Low
        }
    }

    pub fn classify_tone(&self, sentiment_score: f32) -> Tone {
        if sentiment_score >= self.positive_tone_score {
            Tone::Positive
        } else if sentiment_score <= self.negative_tone_score {
            Tone::Negative
        } else {
            Tone::Neutral
        }
    }

    pub fn classify_clarity(&self, confidence: Option<f32>) -> Clarity {
        match confidence {
            Some(c) if c > self.high_clarity_confidence => Clarity::High,
            Some(c) if c > self.moderate_clarity_confidence => Clarity::Moderate,
            Some(_) => Clarity::Low,
            None => Clarity::Unavailable,
        }
    }

    pub fn classify_volume(&self, mean_rms_db: f32) -> VolumeEnergy {
        if mean_rms_db > self.high_volume_rms_db {
            VolumeEnergy::High
        } else if mean_rms_db > self.moderate_volume_rms_db {
            VolumeEnergy::Moderate
        } else {
            VolumeEnergy::Low
        }
    }

    pub fn posture_band(&self, facial_expression_pct: u32) -> PostureBand {
        if facial_expression_pct >= self.good_posture_pct {
            PostureBand::Good
        } else if facial_expression_pct >= self.average_posture_pct {
            PostureBand::Average
        } else {
            PostureBand::Bad
        }
    }

    /// Gesture frequency over sampled frames, scaled to a capped /10 rating
    pub fn gesture_rating(&self, gesture_frames: u32, frames_sampled: u32) -> f32 {
        if frames_sampled == 0 {
            return 0.0;
        }
        ((gesture_frames as f32 / frames_sampled as f32) * 10.0).min(10.0)
    }

    /// Overall performance summary from the three video ratings
    pub fn evaluate_performance(
        &self,
        facial_expression_pct: u32,
        gesture_rating: f32,
        posture: PostureBand,
    ) -> String {
        if facial_expression_pct >= 90 && gesture_rating >= 7.0 && posture == PostureBand::Good {
            "Your overall performance is excellent. Keep up the good work!".to_string()
        } else if facial_expression_pct >= 75 && gesture_rating >= 4.0 && posture != PostureBand::Bad
        {
            "You are doing well overall. Focus on maintaining consistency.".to_string()
        } else if facial_expression_pct >= 50 && gesture_rating >= 2.0 && posture != PostureBand::Bad
        {
            "You have potential. Work on refining your expressions, gestures, and posture."
                .to_string()
        } else {
            "There are areas for improvement. Focus on enhancing expressions, gestures, and posture."
                .to_string()
        }
    }

    /// Classify a full set of audio features against this policy
    pub fn audio_metrics(&self, features: &RawAudioFeatures, transcript: &str) -> AudioMetrics {
        let word_count = transcript.split_whitespace().count();
        let speech_rate_wpm = if features.duration_secs > 0.0 {
            word_count as f32 / (features.duration_secs / 60.0)
        } else {
            0.0
        };
        AudioMetrics {
            speech_rate_wpm,
            fluency: self.classify_fluency(transcript),
            longest_pause_secs: features.longest_pause_secs,
            pitch_variation: self.classify_pitch(features.pitch_stddev_hz),
            word_emphasis: self.classify_emphasis(transcript),
            tone: self.classify_tone(features.sentiment_score),
            pace: self.classify_pace(word_count, features.duration_secs),
            clarity: self.classify_clarity(features.clarity_confidence),
            volume_energy: self.classify_volume(features.mean_rms_db),
        }
    }

    /// Classify a full set of video features against this policy
    pub fn video_metrics(&self, features: &RawVideoFeatures) -> VideoMetrics {
        let facial_expression_pct =
            (features.mean_face_confidence.clamp(0.0, 1.0) * 100.0) as u32;
        let gesture_rating = self.gesture_rating(features.gesture_frames, features.frames_sampled);
        let posture = self.posture_band(facial_expression_pct);
        let overall = self.evaluate_performance(facial_expression_pct, gesture_rating, posture);
        VideoMetrics {
            facial_expression_pct,
            gesture_rating,
            posture,
            overall,
        }
    }
}
