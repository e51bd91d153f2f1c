//! Semantic component: résumé embedding against a fixed set of "ideal résumé"
//! reference texts, scored as the mean of the top-k pairwise similarities.

use crate::oracle::{OracleError, ScoringOracle};

pub const REFERENCE_TEXTS: [&str; 7] = [
    "professional summary with clear career objectives and key achievements",
    "detailed work experience with quantifiable accomplishments and impact metrics",
    "comprehensive technical skills and competencies relevant to the role",
    "educational background with degrees certifications and relevant coursework",
    "strong action verbs describing responsibilities and achievements",
    "contact information including email phone and location",
    "clean formatting with clear section headers and bullet points",
];

/// Cosine similarity clamped to [0, 1]. Zero vectors and length mismatches score 0.
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

/// Mean of the `k` highest values. Averaging over every reference would punish a
/// résumé that is strong in some dimensions and silent on others.
pub fn top_k_mean(mut similarities: Vec<f64>, k: usize) -> f64 {
    similarities.retain(|s| s.is_finite());
    if similarities.is_empty() || k == 0 {
        return 0.0;
    }
    similarities.sort_by(|a, b| b.total_cmp(a));
    similarities.truncate(k);
    similarities.iter().sum::<f64>() / similarities.len() as f64
}

/// Embeds the résumé together with the references in one oracle call.
pub async fn similarity(
    oracle: &dyn ScoringOracle,
    text: &str,
    top_k: usize,
) -> Result<f64, OracleError> {
    let mut texts = Vec::with_capacity(REFERENCE_TEXTS.len() + 1);
    texts.push(text.to_string());
    texts.extend(REFERENCE_TEXTS.iter().map(|r| r.to_string()));

    let embeddings = oracle.embed(&texts).await?;
    let Some((resume, references)) = embeddings.split_first() else {
        return Err(OracleError::Malformed("no embeddings returned".to_string()));
    };
    if references.len() != REFERENCE_TEXTS.len() {
        return Err(OracleError::Malformed(format!(
            "expected {} reference embeddings, got {}",
            REFERENCE_TEXTS.len(),
            references.len()
        )));
    }

    let similarities = references.iter().map(|r| cosine(resume, r)).collect();
    Ok(top_k_mean(similarities, top_k))
}
