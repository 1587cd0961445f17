//! Credit-costing review features offered by the dashboard

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    pub name: String,
    pub credits: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Feature {
    fn builtin(id: &str, name: &str, credits: u32, detail: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            credits,
            detail: detail.map(String::from),
        }
    }
}

/// Features every install starts with
pub fn builtin_features() -> Vec<Feature> {
    vec![
        Feature::builtin(
            "diagnosis",
            "진단",
            8,
            Some("Full listing diagnosis across Naver and Google"),
        ),
        Feature::builtin(
            "reply-draft",
            "AI 답글 생성",
            1,
            Some("Draft a reply to the selected review"),
        ),
        Feature::builtin(
            "review-analysis",
            "리뷰 분석",
            5,
            Some("Sentiment and keyword breakdown"),
        ),
        Feature::builtin("competitor-report", "경쟁사 분석", 12, None),
    ]
}

/// Merge configured features into the built-in list.
/// An entry whose id matches a built-in replaces it, anything else is appended.
pub fn catalog(configured: &[Feature]) -> Vec<Feature> {
    let mut features = builtin_features();

    for extra in configured {
        if extra.name.trim().is_empty() {
            tracing::warn!("Skipping configured feature '{}' with empty name", extra.id);
            continue;
        }

        match features.iter_mut().find(|f| f.id.eq_ignore_ascii_case(&extra.id)) {
            Some(existing) => *existing = extra.clone(),
            None => features.push(extra.clone()),
        }
    }

    features
}

pub fn find<'a>(features: &'a [Feature], id: &str) -> Option<&'a Feature> {
    features.iter().find(|f| f.id.eq_ignore_ascii_case(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_costs() {
        let features = builtin_features();
        let diagnosis = find(&features, "diagnosis").unwrap();
        assert_eq!(diagnosis.name, "진단");
        assert_eq!(diagnosis.credits, 8);
        assert!(find(&features, "DIAGNOSIS").is_some());
        assert!(find(&features, "nope").is_none());
    }

    #[test]
    fn test_catalog_overrides_and_appends() {
        let configured = vec![
            Feature::builtin("reply-draft", "AI 답글 생성", 2, None),
            Feature::builtin("photo-audit", "사진 점검", 3, None),
            Feature::builtin("blank", "  ", 3, None),
        ];

        let features = catalog(&configured);
        assert_eq!(features.len(), builtin_features().len() + 1);
        assert_eq!(find(&features, "reply-draft").unwrap().credits, 2);
        assert_eq!(find(&features, "photo-audit").unwrap().credits, 3);
        assert!(find(&features, "blank").is_none());
    }
}
