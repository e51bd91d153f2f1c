//! ATS Scorer — résumé quality score in [0, 100].
//!
//! Scoring attempt: semantic similarity against reference texts (via the oracle)
//! combined with rule components. If the semantic path fails or times out the
//! rule sum is rescaled to the full range and the result is marked `rules`.

pub mod extract;
pub mod penalties;
pub mod rules;
pub mod semantic;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::fallback::with_fallback;
use crate::models::resume::{ExperienceLevel, ResumeMetrics};
use crate::oracle::ScoringOracle;
use crate::signals::SignalExtractor;
use extract::{analyze_text, ExtractedInfo, ResumeTextSignals, Section};
use penalties::Penalty;
use rules::{score_rules, AtsConfig, RuleBreakdown};

pub const METHODOLOGY_SEMANTIC: &str = "semantic+rules";
pub const METHODOLOGY_RULES: &str = "rules";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AtsStatus {
    Poor,
    Fair,
    Good,
    VeryGood,
    Excellent,
}

impl AtsStatus {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 85.0 => AtsStatus::Excellent,
            s if s >= 75.0 => AtsStatus::VeryGood,
            s if s >= 65.0 => AtsStatus::Good,
            s if s >= 50.0 => AtsStatus::Fair,
            _ => AtsStatus::Poor,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AtsStatus::Excellent => "Outstanding! Your résumé is exceptionally well optimized for ATS systems",
            AtsStatus::VeryGood => "Great! Your résumé is very well optimized for ATS systems",
            AtsStatus::Good => "Good! Your résumé is well structured with minor improvements needed",
            AtsStatus::Fair => "Fair: the foundations are there but key improvements are needed",
            AtsStatus::Poor => "Significant improvements needed: start with the top recommendations",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AtsResult {
    pub score: f64,
    pub status: AtsStatus,
    pub status_message: String,
    pub methodology: String,
    /// Top-k reference similarity, 0.0 – 1.0. `None` when the semantic path failed.
    pub semantic_similarity: Option<f64>,
    pub breakdown: RuleBreakdown,
    pub semantic_points: f64,
    pub penalties: Vec<Penalty>,
    pub penalty_points: f64,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub metrics: ResumeMetrics,
    pub extracted_info: ExtractedInfo,
    pub skills: Vec<String>,
    pub target_level: ExperienceLevel,
    pub detected_level: ExperienceLevel,
    pub years_of_experience: u32,
}

pub struct AtsScorer {
    oracle: Arc<dyn ScoringOracle>,
    extractor: Arc<SignalExtractor>,
    config: AtsConfig,
    timeout: Duration,
}

impl AtsScorer {
    pub fn new(
        oracle: Arc<dyn ScoringOracle>,
        extractor: Arc<SignalExtractor>,
        config: AtsConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            oracle,
            extractor,
            config,
            timeout,
        }
    }

    /// Scores `text` for the target `level`, or for the level detected in the
    /// text when none is given. Never fails: oracle problems only remove the
    /// semantic term.
    pub async fn score(&self, text: &str, level: Option<ExperienceLevel>) -> AtsResult {
        let similarity = if text.trim().is_empty() {
            None
        } else {
            let outcome = with_fallback(
                "ats-semantic",
                self.timeout,
                async {
                    semantic::similarity(self.oracle.as_ref(), text, self.config.semantic_top_k)
                        .await
                        .map(Some)
                },
                |_| async { None },
            )
            .await;
            outcome.into_inner()
        };

        let result = self.score_with_similarity(text, level, similarity);
        info!(
            score = result.score,
            methodology = %result.methodology,
            level = %result.target_level,
            "Résumé scored"
        );
        result
    }

    /// Deterministic part of scoring, given the semantic similarity (if any).
    pub fn score_with_similarity(
        &self,
        text: &str,
        level: Option<ExperienceLevel>,
        similarity: Option<f64>,
    ) -> AtsResult {
        let signals = analyze_text(text, &self.extractor);
        let level = level.unwrap_or(signals.detected_level);
        let breakdown = score_rules(&signals, level, &self.config);
        let penalties = penalties::assess(
            &text.to_lowercase(),
            &signals.verb_frequency,
            &self.config.penalties,
        );
        let penalty_points = penalties::total(&penalties);

        let (raw, semantic_points, methodology) = match similarity {
            Some(sim) => {
                let points = sim.clamp(0.0, 1.0) * self.config.semantic_points;
                (points + breakdown.total(), points, METHODOLOGY_SEMANTIC)
            }
            None => {
                let max = self.config.rule_points();
                let scaled = if max > 0.0 {
                    breakdown.total() * 100.0 / max
                } else {
                    0.0
                };
                (scaled, 0.0, METHODOLOGY_RULES)
            }
        };

        let score = round1((raw - penalty_points).clamp(0.0, 100.0));
        let status = AtsStatus::from_score(score);

        AtsResult {
            score,
            status,
            status_message: status.message().to_string(),
            methodology: methodology.to_string(),
            semantic_similarity: similarity.map(|s| s.clamp(0.0, 1.0)),
            insights: insights(&signals, score, level),
            recommendations: recommendations(&signals, &penalties, level, &self.config),
            breakdown,
            semantic_points: round1(semantic_points),
            penalty_points,
            penalties,
            metrics: signals.metrics(),
            extracted_info: signals.extracted_info.clone(),
            skills: signals.skills.clone(),
            target_level: level,
            detected_level: signals.detected_level,
            years_of_experience: signals.years_of_experience,
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Strengths worth telling the candidate about, phrased for the target level.
fn insights(signals: &ResumeTextSignals, score: f64, level: ExperienceLevel) -> Vec<String> {
    let label = level.label();
    let mut out = vec![match score {
        s if s >= 80.0 => format!("Excellent {label} résumé optimization for ATS systems"),
        s if s >= 70.0 => format!("Very good {label} résumé structure with strong ATS compatibility"),
        s if s >= 60.0 => format!("Good {label} résumé structure with room for enhancement"),
        s if s >= 50.0 => format!("Decent {label} résumé foundation, follow the recommendations to improve"),
        _ => format!("{label} résumé needs improvement, focus on the recommendations below"),
    }];

    if signals.contact.email && signals.contact.phone {
        out.push("Complete contact information present".to_string());
    }

    let info = &signals.extracted_info;
    match (info.linkedin.is_some(), info.github.is_some()) {
        (true, true) => {
            out.push("Strong professional presence with LinkedIn and GitHub profiles".to_string())
        }
        (true, false) | (false, true) => out.push("Professional profile link included".to_string()),
        _ => {}
    }

    if signals.has_section(Section::Education) {
        out.push("Educational background included".to_string());
    }

    match signals.experience_entries {
        0 => {}
        1 => out.push("Work experience included".to_string()),
        2 => out.push("Good work history with 2 experiences".to_string()),
        n => out.push(format!("Rich work history with {n} experiences")),
    }

    match signals.project_entries {
        0 => {}
        1 => out.push("Project work demonstrated".to_string()),
        2 => out.push("Good project showcase with 2 projects".to_string()),
        n => out.push(format!("Strong project portfolio with {n} projects")),
    }

    let sections = signals.sections.len();
    if sections >= 5 {
        out.push(format!("Well-structured with {sections} key sections"));
    } else if sections >= 3 {
        out.push(format!("Good structure with {sections} sections present"));
    }

    let verbs = signals.distinct_verbs();
    if verbs >= 10 {
        out.push(format!("Excellent use of action verbs ({verbs} found)"));
    } else if verbs >= 5 {
        out.push(format!("Good use of action verbs ({verbs} found)"));
    }

    let numbers = signals.number_count;
    if numbers >= 5 {
        out.push(format!("Strong quantification of achievements ({numbers} metrics)"));
    } else if numbers >= 3 {
        out.push(format!("Good quantification of achievements ({numbers} metrics)"));
    }

    let skills = signals.skills.len();
    if skills >= 10 {
        out.push(format!("Comprehensive skill set ({skills} skills identified)"));
    } else if skills >= 5 {
        out.push(format!("Diverse skill set ({skills} skills identified)"));
    }

    if (400..=900).contains(&signals.word_count) {
        out.push("Optimal résumé length for ATS systems".to_string());
    } else if (300..400).contains(&signals.word_count) {
        out.push("Acceptable résumé length but could be more detailed".to_string());
    }

    out
}

fn recommendations(
    signals: &ResumeTextSignals,
    penalties: &[Penalty],
    level: ExperienceLevel,
    config: &AtsConfig,
) -> Vec<String> {
    let thresholds = config.levels.for_level(level);
    let mut out = Vec::new();

    if !signals.contact.email || !signals.contact.phone {
        out.push("Add a professional email address and phone number at the top".to_string());
    }
    if !signals.contact.profile_link {
        out.push("Add a LinkedIn or GitHub profile link".to_string());
    }

    let missing: Vec<&str> = Section::ALL
        .iter()
        .filter(|s| !signals.has_section(**s))
        .map(Section::as_str)
        .collect();
    if !missing.is_empty() {
        out.push(format!("Add clearly labelled sections: {}", missing.join(", ")));
    }

    if signals.distinct_verbs() < thresholds.distinct_verbs {
        out.push(format!(
            "Use more varied action verbs: {} found, {} expected for {} roles",
            signals.distinct_verbs(),
            thresholds.distinct_verbs,
            level.label()
        ));
    }

    match signals.quantified_ratio() {
        Some(r) if r < thresholds.quantified_ratio => out.push(format!(
            "Quantify more achievements: {:.0}% of bullets have numbers, aim for {:.0}%",
            r * 100.0,
            thresholds.quantified_ratio * 100.0
        )),
        None => out.push("Describe your experience in bullet points".to_string()),
        _ => {}
    }

    if signals.total_bullets > 0 && signals.total_bullets < thresholds.bullets {
        out.push(format!(
            "Add more detail: {} bullets found, {} expected for {} roles",
            signals.total_bullets,
            thresholds.bullets,
            level.label()
        ));
    }

    if signals.word_count < 400 {
        out.push(format!(
            "Expand your résumé: {} words, aim for 400-800",
            signals.word_count
        ));
    } else if signals.word_count > 800 {
        out.push(format!(
            "Tighten your résumé: {} words, aim for 400-800",
            signals.word_count
        ));
    }

    if signals.skills.len() < 6 {
        out.push("List more relevant technical skills".to_string());
    }

    for penalty in penalties {
        let tip = match penalty.kind {
            penalties::PenaltyKind::RepeatedVerb => {
                format!("Vary your verbs: {}, use it at most twice", penalty.detail)
            }
            penalties::PenaltyKind::OutdatedSection => {
                format!("Remove outdated content: \"{}\"", penalty.detail)
            }
            penalties::PenaltyKind::Buzzword => {
                format!("Replace the buzzword \"{}\" with a concrete result", penalty.detail)
            }
            penalties::PenaltyKind::WeakPhrase => {
                format!("Start with an action verb instead of \"{}\"", penalty.detail)
            }
        };
        out.push(tip);
    }

    out
}
