//! Nutrition facts lookup by recognized item type

use crate::types::verdict::{Nutrition, Verdict};
use anyhow::{Context, Result};
use config::{Config, File};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Nutrition rows keyed by normalized food name.
#[derive(Debug, Clone, Default)]
pub struct NutritionTable {
    rows: HashMap<String, Nutrition>,
}

/// Lowercase, trim, and treat spaces and hyphens as underscores.
pub fn normalize_food_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

impl NutritionTable {
    pub fn new<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = (S, Nutrition)>,
        S: AsRef<str>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|(name, nutrition)| (normalize_food_name(name.as_ref()), nutrition))
                .collect(),
        }
    }

    /// Load a TOML file with one table per food:
    ///
    /// ```toml
    /// [apple]
    /// protein_g = 0.3
    /// carbohydrates_g = 14.0
    /// ```
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let rows: HashMap<String, Nutrition> = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to read nutrition table")?
            .try_deserialize()
            .context("Failed to deserialize nutrition table")?;

        let table = Self::new(rows);
        info!(
            path = %path.as_ref().display(),
            foods = table.len(),
            "Nutrition table loaded"
        );
        Ok(table)
    }

    pub fn lookup(&self, item_type: &str) -> Option<&Nutrition> {
        self.rows.get(&normalize_food_name(item_type))
    }

    /// Attach nutrition when the verdict names a known item.
    pub fn enrich(&self, verdict: Verdict) -> Verdict {
        let nutrition = verdict
            .item_type
            .as_deref()
            .and_then(|item| self.lookup(item))
            .cloned();
        match nutrition {
            Some(nutrition) => verdict.with_nutrition(nutrition),
            None => verdict,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
