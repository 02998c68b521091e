//! Keyword-based freshness classification of free-text labels

use serde::{Deserialize, Serialize};

/// Substrings that mark a label as not fresh.
pub const DEFAULT_NOT_FRESH_KEYWORDS: &[&str] =
    &["rotten", "stale", "bad", "spoiled", "decay", "mold", "damaged"];

/// Freshness implied by a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelFreshness {
    Fresh,
    NotFresh,
}

/// Classifies labels by case-insensitive substring match against a keyword list.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    /// Lowercased, non-empty keywords
    keywords: Vec<String>,
}

impl KeywordClassifier {
    /// Create a classifier from a keyword list; blank entries are ignored.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    /// Classify a label. Empty or unmatched labels are fresh.
    pub fn classify(&self, label: &str) -> LabelFreshness {
        if label.is_empty() {
            return LabelFreshness::Fresh;
        }

        let label = label.to_lowercase();
        if self.keywords.iter().any(|k| label.contains(k.as_str())) {
            LabelFreshness::NotFresh
        } else {
            LabelFreshness::Fresh
        }
    }

    pub fn is_fresh(&self, label: &str) -> bool {
        self.classify(label) == LabelFreshness::Fresh
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_NOT_FRESH_KEYWORDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keywords() {
        let classifier = KeywordClassifier::default();

        assert_eq!(classifier.classify("rotten_apple"), LabelFreshness::NotFresh);
        assert_eq!(classifier.classify("Bad Banana"), LabelFreshness::NotFresh);
        assert_eq!(classifier.classify("MOLDY bread"), LabelFreshness::NotFresh);
        assert_eq!(classifier.classify("damaged-orange"), LabelFreshness::NotFresh);
        assert_eq!(classifier.classify("fresh_apple"), LabelFreshness::Fresh);
        assert_eq!(classifier.classify("tomato"), LabelFreshness::Fresh);
    }

    #[test]
    fn test_empty_label_is_fresh() {
        let classifier = KeywordClassifier::default();
        assert!(classifier.is_fresh(""));
    }

    #[test]
    fn test_custom_keywords() {
        let classifier = KeywordClassifier::new(["Wilted", " ", "bruised"]);
        assert_eq!(classifier.keywords(), &["wilted".to_string(), "bruised".to_string()]);

        assert!(!classifier.is_fresh("wilted_lettuce"));
        assert!(!classifier.is_fresh("Bruised Peach"));
        // Default vocabulary no longer applies
        assert!(classifier.is_fresh("rotten_apple"));
    }
}
