//! Résumé text → structural signals.
//!
//! Everything here is a pure function of the text. Matching is done on a
//! lower-cased copy; line structure is preserved for bullets and section headers.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{Datelike, Utc};
use regex::Regex;
use serde::Serialize;

use crate::models::resume::{ExperienceLevel, ResumeMetrics};
use crate::signals::SignalExtractor;

/// The six sections a complete résumé is expected to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Experience,
    Education,
    Skills,
    Summary,
    Projects,
    Certifications,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Experience,
        Section::Education,
        Section::Skills,
        Section::Summary,
        Section::Projects,
        Section::Certifications,
    ];

    fn header_keywords(&self) -> &'static [&'static str] {
        match self {
            Section::Experience => &[
                "experience",
                "work experience",
                "professional experience",
                "work history",
                "employment",
                "workexperience",
            ],
            Section::Education => &["education", "academic", "qualifications"],
            Section::Skills => &["skills", "technical skills", "competencies", "expertise", "abilities"],
            Section::Summary => &["summary", "objective", "profile", "about me", "about"],
            Section::Projects => &["projects", "key projects", "personal projects", "portfolio", "work samples"],
            Section::Certifications => &["certifications", "certificates", "licenses"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Experience => "Experience",
            Section::Education => "Education",
            Section::Skills => "Skills",
            Section::Summary => "Summary",
            Section::Projects => "Projects",
            Section::Certifications => "Certifications",
        }
    }
}

pub const ACTION_VERBS: &[&str] = &[
    "achieved", "improved", "developed", "implemented", "managed", "created", "increased",
    "reduced", "led", "designed", "built", "optimized", "launched", "delivered", "executed",
    "established", "streamlined", "spearheaded", "automated", "collaborated", "coordinated",
    "directed", "engineered", "enhanced", "founded", "generated", "initiated", "integrated",
    "maintained", "operated", "planned", "programmed", "resolved", "supervised", "trained",
    "upgraded", "validated", "architected", "deployed", "facilitated", "migrated", "modernized",
    "orchestrated", "pioneered", "scaled", "accelerated", "drove", "transformed", "revamped",
    "overhauled",
];

const STUDENT_INDICATORS: &[&str] = &[
    "3rd year", "third year", "4th year", "fourth year", "undergraduate", "pursuing",
    "expected graduation", "currently studying", "student at", "bachelor's student",
    "master's student", "graduating 20",
];

const SENIOR_KEYWORDS: &[&str] = &["senior", "lead", "principal", "staff", "architect", "head of"];

const YEAR_RANGE_CAP: u32 = 20;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").unwrap());

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap()
});

static PROFILE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(linkedin\.com/in/[a-z0-9-]+|github\.com/[a-z0-9-]+|(linkedin|github):\s*@?[a-z0-9-]+)")
        .unwrap()
});

static LINKEDIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:linkedin\.com/in/|linkedin:\s*@?)([a-z0-9-]+)").unwrap()
});

static GITHUB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:github\.com/|github:\s*@?)([a-z0-9-]+)").unwrap());

static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*[•\-\*◦▪]\s+").unwrap());

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d+[%$,kmKMbB]?\b").unwrap());

static YEAR_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b((?:19|20)\d{2})\s*(?:-|–|—|to)\s*((?:19|20)\d{2}|present|current|now)\b").unwrap()
});

static EXPLICIT_YEARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})\+?\s*years?\s+(?:of\s+)?experience").unwrap());

static ACTION_VERB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b({})\b", ACTION_VERBS.join("|"))).unwrap()
});

/// Any one of these in a bullet makes it "quantified".
static QUANTIFIERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\d+\s*%",
        r"\d+\s*(percent|percentage)",
        r"[$€£]\s*\d+",
        r"\d[\d,.]*\s*(million|thousand|billion|k|m|b)\b",
        r"\d[\d,]*\+?\s*(users|customers|clients|people|participants|members|students|engineers|requests)",
        r"\d[\d,]*\s*(hours|days|weeks|months|years)",
        r"\d[\d,]*\s*(projects|features|components|modules|systems|applications|apps|services)",
        r"\d[\d,.]*\s*(x|times)\b",
        r"(increased|decreased|reduced|improved|boosted|grew|raised|cut|saved|enhanced)\s+\w*\s*by\s*\d+",
        r"(over|more than|under|less than|up to)\s+\d+",
        r"\d[\d,]*\s*(metrics|kpis|tickets|issues|bugs|tests)",
        r"\d[\d,]*\s*(revenue|sales|profit|cost|budget)",
        r"from\s+\d+.*to\s+\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub email: bool,
    pub phone: bool,
    pub profile_link: bool,
}

impl ContactInfo {
    pub fn any(&self) -> bool {
        self.email || self.phone || self.profile_link
    }
}

/// Contact and profile values found in the text, first match of each.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    /// LinkedIn handle, without the URL.
    pub linkedin: Option<String>,
    /// GitHub handle, without the URL.
    pub github: Option<String>,
}

/// Structural signals derived from raw résumé text.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeTextSignals {
    pub word_count: u32,
    pub contact: ContactInfo,
    pub extracted_info: ExtractedInfo,
    pub sections: Vec<Section>,
    pub verb_frequency: BTreeMap<String, u32>,
    pub total_bullets: u32,
    pub quantified_bullets: u32,
    pub number_count: u32,
    pub experience_entries: u32,
    pub project_entries: u32,
    pub skills: Vec<String>,
    pub detected_level: ExperienceLevel,
    pub years_of_experience: u32,
}

impl ResumeTextSignals {
    pub fn distinct_verbs(&self) -> u32 {
        self.verb_frequency.len() as u32
    }

    /// `None` when the résumé has no bullets at all.
    pub fn quantified_ratio(&self) -> Option<f64> {
        (self.total_bullets > 0).then(|| self.quantified_bullets as f64 / self.total_bullets as f64)
    }

    pub fn has_section(&self, section: Section) -> bool {
        self.sections.contains(&section)
    }

    pub fn metrics(&self) -> ResumeMetrics {
        ResumeMetrics {
            word_count: self.word_count,
            sections_found: self.sections.len() as u32,
            action_verb_count: self.distinct_verbs(),
            quantified_bullet_ratio: self.quantified_ratio().unwrap_or(0.0),
        }
    }
}

pub fn analyze_text(text: &str, extractor: &SignalExtractor) -> ResumeTextSignals {
    let lower = text.to_lowercase();
    let lines: Vec<&str> = text.lines().collect();

    let bullets = collect_bullets(&lines);
    let quantified_bullets = bullets
        .iter()
        .filter(|b| is_quantified(&b.to_lowercase()))
        .count() as u32;

    let mut verb_frequency: BTreeMap<String, u32> = BTreeMap::new();
    for m in ACTION_VERB.find_iter(&lower) {
        *verb_frequency.entry(m.as_str().to_string()).or_default() += 1;
    }

    let years_of_experience = estimate_years(&lower);
    let total_bullets = bullets.len() as u32;

    ResumeTextSignals {
        word_count: text.split_whitespace().count() as u32,
        contact: detect_contact(text),
        extracted_info: extract_info(text),
        sections: detect_sections(&lines),
        verb_frequency,
        total_bullets,
        quantified_bullets,
        number_count: NUMBER.find_iter(text).count() as u32,
        experience_entries: YEAR_RANGE.find_iter(&lower).count() as u32,
        project_entries: count_project_entries(&lines),
        skills: extractor.detect_in_text(text),
        detected_level: detect_level(&lower, years_of_experience, total_bullets),
        years_of_experience,
    }
}

pub fn detect_contact(text: &str) -> ContactInfo {
    ContactInfo {
        email: EMAIL.is_match(text),
        phone: PHONE.is_match(text),
        profile_link: PROFILE_LINK.is_match(text),
    }
}

pub fn extract_info(text: &str) -> ExtractedInfo {
    let first = |re: &Regex| re.find(text).map(|m| m.as_str().trim().to_string());
    let handle = |re: &Regex| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    };
    ExtractedInfo {
        email: first(&EMAIL),
        phone: first(&PHONE),
        linkedin: handle(&LINKEDIN),
        github: handle(&GITHUB),
    }
}

/// Sections present as header lines, in canonical order.
pub fn detect_sections(lines: &[&str]) -> Vec<Section> {
    let mut found: Vec<Section> = lines.iter().filter_map(|l| section_header(l)).collect();
    found.sort();
    found.dedup();
    found
}

/// A header is a short line starting with a section keyword ("Work Experience:",
/// "TECHNICAL SKILLS"). Bullets are never headers.
fn section_header(line: &str) -> Option<Section> {
    if BULLET.is_match(line) {
        return None;
    }
    let normalized = line.trim().trim_end_matches(':').trim().to_lowercase();
    if normalized.is_empty() || normalized.split_whitespace().count() > 4 {
        return None;
    }

    Section::ALL.into_iter().find(|section| {
        section.header_keywords().iter().any(|kw| {
            normalized == *kw
                || normalized
                    .strip_prefix(kw)
                    .is_some_and(|rest| rest.starts_with(|c: char| !c.is_alphanumeric()))
                || normalized.ends_with(&format!(" {kw}"))
        })
    })
}

/// Bullets with their continuation lines joined. A blank line or a section
/// header ends the current bullet.
fn collect_bullets(lines: &[&str]) -> Vec<String> {
    let mut bullets = Vec::new();
    let mut current: Option<String> = None;

    for line in lines {
        if BULLET.is_match(line) {
            if let Some(done) = current.take() {
                bullets.push(done);
            }
            current = Some(line.trim().to_string());
        } else if line.trim().is_empty() || section_header(line).is_some() {
            if let Some(done) = current.take() {
                bullets.push(done);
            }
        } else if let Some(bullet) = current.as_mut() {
            bullet.push(' ');
            bullet.push_str(line.trim());
        }
    }

    if let Some(done) = current {
        bullets.push(done);
    }
    bullets
}

fn is_quantified(bullet_lower: &str) -> bool {
    QUANTIFIERS.iter().any(|re| re.is_match(bullet_lower))
}

/// Non-bullet lines inside the Projects section: each one names a project.
fn count_project_entries(lines: &[&str]) -> u32 {
    let mut in_projects = false;
    let mut count = 0;

    for line in lines {
        if let Some(section) = section_header(line) {
            in_projects = section == Section::Projects;
            continue;
        }
        let trimmed = line.trim();
        if in_projects && !trimmed.is_empty() && !BULLET.is_match(line) && !trimmed.starts_with("http") {
            count += 1;
        }
    }
    count
}

/// Explicit "N years of experience" wins; otherwise year ranges are summed.
fn estimate_years(lower: &str) -> u32 {
    let explicit = EXPLICIT_YEARS
        .captures_iter(lower)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .max();
    if let Some(years) = explicit {
        return years;
    }

    let current_year = Utc::now().year() as u32;
    let total: u32 = YEAR_RANGE
        .captures_iter(lower)
        .filter_map(|c| {
            let start = c[1].parse::<u32>().ok()?;
            let end = match &c[2] {
                "present" | "current" | "now" => current_year,
                year => year.parse::<u32>().ok()?,
            };
            Some(end.saturating_sub(start))
        })
        .sum();

    total.min(YEAR_RANGE_CAP)
}

fn detect_level(lower: &str, years: u32, total_bullets: u32) -> ExperienceLevel {
    if STUDENT_INDICATORS.iter().any(|s| lower.contains(s)) {
        return ExperienceLevel::Entry;
    }
    let has_senior_title = SENIOR_KEYWORDS
        .iter()
        .any(|kw| crate::signals::contains_term(lower, kw));

    match years {
        y if y >= 7 => ExperienceLevel::Senior,
        y if y >= 5 && has_senior_title => ExperienceLevel::Senior,
        y if y >= 3 => ExperienceLevel::Mid,
        0 if total_bullets >= 25 => ExperienceLevel::Senior,
        0 if total_bullets >= 15 => ExperienceLevel::Mid,
        _ => ExperienceLevel::Entry,
    }
}
