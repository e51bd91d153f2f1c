use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ats::extract::analyze_text;
use crate::signals::SignalExtractor;

/// Target experience level declared by the caller. Drives ATS thresholds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    #[default]
    Entry,
    Mid,
    Senior,
}

impl ExperienceLevel {
    /// Lenient parse used at the HTTP boundary. Unknown tags fall back to `Entry`,
    /// `student`/`intern` fold into `Entry`, `principal`/`staff` into `Senior`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "mid" | "mid-level" | "intermediate" => ExperienceLevel::Mid,
            "senior" | "principal" | "staff" | "lead" => ExperienceLevel::Senior,
            _ => ExperienceLevel::Entry,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Entry => "entry",
            ExperienceLevel::Mid => "mid",
            ExperienceLevel::Senior => "senior",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExperienceLevel::Entry => "Entry-Level",
            ExperienceLevel::Mid => "Mid-Level",
            ExperienceLevel::Senior => "Senior-Level",
        }
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary metrics stored alongside an analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeMetrics {
    pub word_count: u32,
    pub sections_found: u32,
    pub action_verb_count: u32,
    /// quantified bullets ÷ total bullets, 0.0 – 1.0
    pub quantified_bullet_ratio: f64,
}

/// Normalized résumé analysis. Replaced wholesale on re-analysis, never merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeAnalysis {
    pub score: f64,
    pub skills: BTreeMap<String, Vec<String>>,
    pub extracted_text: String,
    pub metrics: ResumeMetrics,
    #[serde(default)]
    pub experience_level: Option<ExperienceLevel>,
    #[serde(default)]
    pub years_of_experience: Option<u32>,
    /// Set when the payload was migrated from an older schema and should be re-analyzed.
    #[serde(default)]
    pub outdated: bool,
}

impl ResumeAnalysis {
    /// Total keyword count across all categories.
    pub fn skill_count(&self) -> usize {
        self.skills.values().map(Vec::len).sum()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Versioned payloads
// ────────────────────────────────────────────────────────────────────────────

/// First-generation analysis: flat skill list, no metrics.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisV1 {
    pub score: f64,
    pub skills: Vec<String>,
    #[serde(default)]
    pub extracted_text: String,
}

/// Current analysis schema: categorized skills plus metrics.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisV2 {
    pub score: f64,
    pub skills: BTreeMap<String, Vec<String>>,
    pub extracted_text: String,
    pub metrics: ResumeMetrics,
    #[serde(default)]
    pub experience_level: Option<ExperienceLevel>,
    #[serde(default)]
    pub years_of_experience: Option<u32>,
}

/// Any analysis payload accepted at the boundary. V2 is tried first.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AnalysisPayload {
    V2(AnalysisV2),
    V1(AnalysisV1),
}

impl AnalysisPayload {
    pub fn is_outdated(&self) -> bool {
        matches!(self, AnalysisPayload::V1(_))
    }

    /// Migrates the payload to the current `ResumeAnalysis` shape.
    ///
    /// V1 skills are re-classified through the extractor's category tables and
    /// metrics are recomputed from the stored text.
    pub fn normalize(self, extractor: &SignalExtractor) -> ResumeAnalysis {
        match self {
            AnalysisPayload::V2(v2) => ResumeAnalysis {
                score: v2.score.clamp(0.0, 100.0),
                skills: v2.skills,
                extracted_text: v2.extracted_text,
                metrics: v2.metrics,
                experience_level: v2.experience_level,
                years_of_experience: v2.years_of_experience,
                outdated: false,
            },
            AnalysisPayload::V1(v1) => {
                let signals = analyze_text(&v1.extracted_text, extractor);
                ResumeAnalysis {
                    score: v1.score.clamp(0.0, 100.0),
                    skills: extractor.categorize(&v1.skills),
                    metrics: signals.metrics(),
                    experience_level: Some(signals.detected_level),
                    years_of_experience: Some(signals.years_of_experience),
                    extracted_text: v1.extracted_text,
                    outdated: true,
                }
            }
        }
    }
}
