//! crates/researchmate_core/src/fallback.rs
//!
//! `FallbackPolicy` implementations for the document workflow.

use crate::domain::{AnalysisResult, DocumentId, Keyword, Summary, UploadFile};
use crate::ports::FallbackPolicy;
use chrono::Utc;
use rand::Rng;
use std::time::Duration;

pub const DEFAULT_FALLBACK_DELAY: Duration = Duration::from_millis(2000);

const DEMO_SUMMARY: &str = "This is a mock summary for demonstration purposes.";
const DEMO_BULLETS: [&str; 3] = [
    "Key finding 1: Important discovery in the field",
    "Key finding 2: Novel methodology presented",
    "Key finding 3: Significant results obtained",
];
const DEMO_KEYWORDS: [&str; 5] = ["research", "analysis", "methodology", "results", "findings"];

/// Keeps the interactive flow demonstrable while the backend is down by substituting a
/// fixed mock analysis.
#[derive(Debug, Clone)]
pub struct DemoFallback {
    delay: Duration,
}

impl DemoFallback {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for DemoFallback {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_DELAY)
    }
}

impl FallbackPolicy for DemoFallback {
    fn synthesize(&self, _file: &UploadFile) -> Option<AnalysisResult> {
        let document_id: DocumentId = rand::thread_rng().gen_range(0..1000);
        Some(demo_analysis(document_id))
    }

    fn delay(&self) -> Duration {
        self.delay
    }
}

/// Surfaces every failure as-is. For deployments where a mock result would mislead.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFallback;

impl FallbackPolicy for NoFallback {
    fn synthesize(&self, _file: &UploadFile) -> Option<AnalysisResult> {
        None
    }

    fn delay(&self) -> Duration {
        Duration::ZERO
    }
}

fn demo_analysis(document_id: DocumentId) -> AnalysisResult {
    let now = Utc::now();
    let keywords = DEMO_KEYWORDS
        .iter()
        .enumerate()
        .map(|(i, keyword)| Keyword {
            id: Some(i as i64 + 1),
            keyword: keyword.to_string(),
            score: None,
            extraction_method: None,
            created_at: Some(now),
            document_id: Some(document_id),
        })
        .collect();

    AnalysisResult {
        document_id,
        summary: Some(Summary {
            id: Some(1),
            summary_text: DEMO_SUMMARY.to_string(),
            bullet_points: Some(DEMO_BULLETS.iter().map(|b| b.to_string()).collect()),
            created_at: Some(now),
            document_id: Some(document_id),
        }),
        keywords,
        processing_status: "completed".to_string(),
        error_message: None,
    }
}
