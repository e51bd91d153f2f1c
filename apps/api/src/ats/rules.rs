//! Rule-based ATS components. Each component is capped at its configured points;
//! the level-dependent ones reach full points at a threshold that grows
//! entry < mid < senior.

use serde::{Deserialize, Serialize};

use crate::ats::extract::{ResumeTextSignals, Section};
use crate::ats::penalties::PenaltyConfig;
use crate::models::resume::ExperienceLevel;

/// Counts needed for full points at one experience level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelThresholds {
    pub distinct_verbs: u32,
    pub quantified_ratio: f64,
    pub depth_entries: u32,
    pub bullets: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelTable {
    pub entry: LevelThresholds,
    pub mid: LevelThresholds,
    pub senior: LevelThresholds,
}

impl LevelTable {
    pub fn for_level(&self, level: ExperienceLevel) -> &LevelThresholds {
        match level {
            ExperienceLevel::Entry => &self.entry,
            ExperienceLevel::Mid => &self.mid,
            ExperienceLevel::Senior => &self.senior,
        }
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        Self {
            entry: LevelThresholds {
                distinct_verbs: 6,
                quantified_ratio: 0.3,
                depth_entries: 2,
                bullets: 10,
            },
            mid: LevelThresholds {
                distinct_verbs: 10,
                quantified_ratio: 0.4,
                depth_entries: 4,
                bullets: 18,
            },
            senior: LevelThresholds {
                distinct_verbs: 14,
                quantified_ratio: 0.5,
                depth_entries: 6,
                bullets: 25,
            },
        }
    }
}

/// Step function: the first band whose `[min, max]` contains the value wins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: u32,
    pub max: u32,
    pub fraction: f64,
}

fn band_fraction(bands: &[Band], value: u32) -> f64 {
    bands
        .iter()
        .find(|b| (b.min..=b.max).contains(&value))
        .map_or(0.0, |b| b.fraction)
}

/// Weights and thresholds for ATS scoring. Every field has a default; a JSON
/// override only needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AtsConfig {
    pub semantic_points: f64,
    pub semantic_top_k: usize,
    pub contact_points: f64,
    pub section_points: f64,
    pub verb_points: f64,
    pub quantified_points: f64,
    pub depth_points: f64,
    pub bullet_points: f64,
    pub word_count_points: f64,
    pub skill_points: f64,
    pub levels: LevelTable,
    pub word_count_bands: Vec<Band>,
    pub skill_bands: Vec<Band>,
    pub penalties: PenaltyConfig,
}

impl Default for AtsConfig {
    fn default() -> Self {
        Self {
            semantic_points: 35.0,
            semantic_top_k: 3,
            contact_points: 8.0,
            section_points: 12.0,
            verb_points: 10.0,
            quantified_points: 12.0,
            depth_points: 5.0,
            bullet_points: 5.0,
            word_count_points: 8.0,
            skill_points: 5.0,
            levels: LevelTable::default(),
            word_count_bands: vec![
                Band { min: 400, max: 800, fraction: 1.0 },
                Band { min: 300, max: 1000, fraction: 0.625 },
                Band { min: 200, max: 1200, fraction: 0.25 },
            ],
            skill_bands: vec![
                Band { min: 15, max: u32::MAX, fraction: 1.0 },
                Band { min: 10, max: 14, fraction: 0.8 },
                Band { min: 6, max: 9, fraction: 0.6 },
                Band { min: 3, max: 5, fraction: 0.3 },
            ],
            penalties: PenaltyConfig::default(),
        }
    }
}

impl AtsConfig {
    /// Maximum reachable rule-based points.
    pub fn rule_points(&self) -> f64 {
        self.contact_points
            + self.section_points
            + self.verb_points
            + self.quantified_points
            + self.depth_points
            + self.bullet_points
            + self.word_count_points
            + self.skill_points
    }
}

/// Points earned per rule component.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleBreakdown {
    pub contact: f64,
    pub sections: f64,
    pub action_verbs: f64,
    pub quantified_bullets: f64,
    pub experience_depth: f64,
    pub bullet_volume: f64,
    pub word_count: f64,
    pub skills: f64,
}

impl RuleBreakdown {
    pub fn total(&self) -> f64 {
        self.contact
            + self.sections
            + self.action_verbs
            + self.quantified_bullets
            + self.experience_depth
            + self.bullet_volume
            + self.word_count
            + self.skills
    }
}

fn ratio(value: f64, full_at: f64) -> f64 {
    if full_at <= 0.0 {
        return 1.0;
    }
    (value / full_at).clamp(0.0, 1.0)
}

pub fn score_rules(
    signals: &ResumeTextSignals,
    level: ExperienceLevel,
    config: &AtsConfig,
) -> RuleBreakdown {
    let thresholds = config.levels.for_level(level);

    let contact = &signals.contact;
    let contact_fraction = (if contact.email { 3.0 } else { 0.0 }
        + if contact.phone { 3.0 } else { 0.0 }
        + if contact.profile_link { 2.0 } else { 0.0 })
        / 8.0;

    let section_fraction = signals.sections.len() as f64 / Section::ALL.len() as f64;

    // Without bullets, bare numbers earn at most half the quantification points.
    let quantified_fraction = match signals.quantified_ratio() {
        Some(r) => ratio(r, thresholds.quantified_ratio),
        None => ratio(signals.number_count as f64, 10.0) * 0.5,
    };

    let depth = (signals.experience_entries + signals.project_entries) as f64;

    RuleBreakdown {
        contact: contact_fraction * config.contact_points,
        sections: section_fraction * config.section_points,
        action_verbs: ratio(signals.distinct_verbs() as f64, thresholds.distinct_verbs as f64)
            * config.verb_points,
        quantified_bullets: quantified_fraction * config.quantified_points,
        experience_depth: ratio(depth, thresholds.depth_entries as f64) * config.depth_points,
        bullet_volume: ratio(signals.total_bullets as f64, thresholds.bullets as f64)
            * config.bullet_points,
        word_count: band_fraction(&config.word_count_bands, signals.word_count)
            * config.word_count_points,
        skills: band_fraction(&config.skill_bands, signals.skills.len() as u32) * config.skill_points,
    }
}
