use serde::Serialize;

use crate::ats::extract::{detect_contact, detect_sections, Section};
use crate::errors::AppError;
use crate::models::resume::ResumeAnalysis;

const MIN_SKILLS: usize = 3;
const MIN_SECTIONS: u32 = 2;
const WORD_BAND: (u32, u32) = (100, 5000);
const REQUIRED_PASSES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Check {
    pub name: &'static str,
    pub passed: bool,
}

/// Structural heuristics run before any job search. A document passes when at
/// least three of the five checks hold.
pub fn validate_resume(analysis: &ResumeAnalysis) -> Result<Vec<Check>, AppError> {
    let text = analysis.extracted_text.as_str();
    let lines: Vec<&str> = text.lines().collect();
    let text_sections = detect_sections(&lines);

    let sections_found = analysis.metrics.sections_found.max(text_sections.len() as u32);
    let word_count = match analysis.metrics.word_count {
        0 => text.split_whitespace().count() as u32,
        n => n,
    };

    let checks = vec![
        Check {
            name: "skills",
            passed: analysis.skill_count() >= MIN_SKILLS,
        },
        Check {
            name: "sections",
            passed: sections_found >= MIN_SECTIONS,
        },
        Check {
            name: "contact info",
            passed: detect_contact(text).any(),
        },
        Check {
            name: "experience or education",
            passed: text_sections.contains(&Section::Experience)
                || text_sections.contains(&Section::Education),
        },
        Check {
            name: "word count",
            passed: (WORD_BAND.0..=WORD_BAND.1).contains(&word_count),
        },
    ];

    let passed = checks.iter().filter(|c| c.passed).count();
    if passed >= REQUIRED_PASSES {
        return Ok(checks);
    }

    let failed: Vec<&str> = checks.iter().filter(|c| !c.passed).map(|c| c.name).collect();
    Err(AppError::InvalidResumeFormat(format!(
        "The document does not look like a résumé ({passed} of {} checks passed; missing: {})",
        checks.len(),
        failed.join(", ")
    )))
}
