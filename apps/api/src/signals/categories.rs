//! Static category tables for keyword classification.
//!
//! The tables are data, not code: the default set is embedded from
//! `data/skill_categories.json` and can be replaced at startup via
//! `SKILL_CATEGORIES_PATH`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const EMBEDDED_TABLES: &str = include_str!("../../data/skill_categories.json");

static DEFAULT_TABLES: LazyLock<CategoryTables> = LazyLock::new(|| {
    serde_json::from_str(EMBEDDED_TABLES).expect("embedded skill_categories.json must be valid")
});

/// Keyword categories, in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkillCategory {
    HighValueCombo,
    Language,
    Framework,
    Database,
    CloudDevops,
    DataScience,
    SoftSkill,
    Business,
    Design,
    Management,
    Uncategorized,
}

impl SkillCategory {
    /// Order in which tables are consulted when classifying.
    pub const CLASSIFY_ORDER: [SkillCategory; 10] = [
        SkillCategory::HighValueCombo,
        SkillCategory::Language,
        SkillCategory::Framework,
        SkillCategory::Database,
        SkillCategory::CloudDevops,
        SkillCategory::DataScience,
        SkillCategory::SoftSkill,
        SkillCategory::Business,
        SkillCategory::Design,
        SkillCategory::Management,
    ];

    /// Order in which categories contribute to the search query.
    /// Technical terms first: providers weight earlier terms more heavily.
    pub const QUERY_ORDER: [SkillCategory; 11] = [
        SkillCategory::HighValueCombo,
        SkillCategory::Framework,
        SkillCategory::Language,
        SkillCategory::CloudDevops,
        SkillCategory::Database,
        SkillCategory::DataScience,
        SkillCategory::Business,
        SkillCategory::Design,
        SkillCategory::Management,
        SkillCategory::SoftSkill,
        SkillCategory::Uncategorized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillCategory::HighValueCombo => "high-value-combo",
            SkillCategory::Language => "language",
            SkillCategory::Framework => "framework",
            SkillCategory::Database => "database",
            SkillCategory::CloudDevops => "cloud-devops",
            SkillCategory::DataScience => "data-science",
            SkillCategory::SoftSkill => "soft-skill",
            SkillCategory::Business => "business",
            SkillCategory::Design => "design",
            SkillCategory::Management => "management",
            SkillCategory::Uncategorized => "uncategorized",
        }
    }

    pub fn is_soft(&self) -> bool {
        matches!(self, SkillCategory::SoftSkill)
    }
}

fn default_query() -> String {
    "general professional".to_string()
}

fn default_soft_skill_limit() -> usize {
    5
}

fn default_max_query_terms() -> usize {
    15
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTables {
    #[serde(default = "default_query")]
    pub default_query: String,
    #[serde(default = "default_soft_skill_limit")]
    pub soft_skill_limit: usize,
    #[serde(default = "default_max_query_terms")]
    pub max_query_terms: usize,
    pub categories: BTreeMap<SkillCategory, Vec<String>>,
}

impl Default for CategoryTables {
    fn default() -> Self {
        DEFAULT_TABLES.clone()
    }
}

impl CategoryTables {
    /// Loads replacement tables from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read category tables at {}", path.display()))?;
        let mut tables: CategoryTables = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid category tables in {}", path.display()))?;
        tables.normalize();
        Ok(tables)
    }

    pub fn terms(&self, category: SkillCategory) -> &[String] {
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every known term with its category, in classification priority order.
    pub fn all_terms(&self) -> impl Iterator<Item = (SkillCategory, &str)> + '_ {
        SkillCategory::CLASSIFY_ORDER
            .iter()
            .flat_map(move |cat| self.terms(*cat).iter().map(move |t| (*cat, t.as_str())))
    }

    fn normalize(&mut self) {
        for terms in self.categories.values_mut() {
            for term in terms.iter_mut() {
                *term = term.trim().to_lowercase();
            }
            terms.retain(|t| !t.is_empty());
        }
    }
}
