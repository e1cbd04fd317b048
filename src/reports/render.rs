//! Report rendering port
//!
//! PDF layout is an external collaborator; the pipeline only needs "turn an
//! aggregated result into artifact bytes". The JSON renderer ships as the
//! default artifact format.

use crate::analysis::types::AggregatedResult;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::json;

/// Metadata stamped onto every rendered report
#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub report_id: String,
    pub activity: String,
    pub generated_at: DateTime<Utc>,
}

/// Renders an aggregated result into artifact bytes
pub trait ReportRenderer: Send + Sync {
    /// Extension for the artifact file, without the dot
    fn file_extension(&self) -> &'static str;

    fn render(&self, result: &AggregatedResult, meta: &ReportMeta) -> Result<Vec<u8>>;
}

/// JSON artifact renderer
#[derive(Default)]
pub struct JsonReportRenderer;

impl ReportRenderer for JsonReportRenderer {
    fn file_extension(&self) -> &'static str {
        "json"
    }

    fn render(&self, result: &AggregatedResult, meta: &ReportMeta) -> Result<Vec<u8>> {
        let audio = &result.audio_metrics;
        let video = &result.video_metrics;
        let document = json!({
            "report_id": meta.report_id,
            "activity": meta.activity,
            "generated_at": meta.generated_at.to_rfc3339(),
            "audio": {
                "Speech Rate (words per minute)": format!("{:.2}", audio.speech_rate_wpm),
                "Fluency": audio.fluency.to_string(),
                "Pauses": audio.longest_pause_secs,
                "Pitch and Tone Variations": audio.pitch_variation.to_string(),
                "Word Emphasis": audio.word_emphasis.to_string(),
                "Tone Analysis": audio.tone.to_string(),
                "Pace Analysis": audio.pace.to_string(),
                "Clarity Analysis": audio.clarity.to_string(),
                "Volume and Energy Analysis": audio.volume_energy.to_string(),
            },
            "video": {
                "Facial Expressions (Percentage)": format!("{}%", video.facial_expression_pct),
                "Hand Gesture Rating (out of 10)": video.gesture_rating,
                "Body Posture Rating": video.posture.to_string(),
                "Overall Confidence Report": video.overall,
            },
            "narrative": result.ai_narrative,
        });
        Ok(serde_json::to_vec_pretty(&document)?)
    }
}
