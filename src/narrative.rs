//! Advisory narrative generation
//!
//! Stages describe their decision through a [`Narrator`]. Narratives are
//! advisory: [`narrate_advisory`] turns any failure into `None` so that a
//! missing explanation never changes a stage outcome.

use crate::error::{Result, RetailError};
use crate::types::Stage;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

/// Ordered fact sheet handed to a narrator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NarrativeFacts {
    facts: BTreeMap<String, String>,
}

impl NarrativeFacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.facts.insert(key.to_string(), value.to_string());
        self
    }

    /// Insert only when a value is present
    pub fn with_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.facts.get(key).map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.facts.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

/// Narrative generator collaborator
///
/// A panic inside `narrate` is recovered and treated as a missing narrative.
pub trait Narrator: Send + Sync {
    /// Produce explanation text for a stage decision
    fn narrate(&self, stage: Stage, facts: &NarrativeFacts) -> Result<String>;

    /// Narrator name
    fn name(&self) -> &str;
}

/// Call a narrator, recovering any failure as `None`.
///
/// A panicking narrator is treated like one that returned an error.
pub fn narrate_advisory(narrator: &dyn Narrator, stage: Stage, facts: &NarrativeFacts) -> Option<String> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| narrator.narrate(stage, facts)));
    match outcome {
        Ok(Ok(text)) if !text.trim().is_empty() => Some(text),
        Ok(Ok(_)) => {
            log::warn!("{} narrator returned empty text for {} stage", narrator.name(), stage);
            None
        }
        Ok(Err(e)) => {
            log::warn!("Narrative skipped: {}", e);
            None
        }
        Err(_) => {
            log::warn!("{} narrator panicked during {} stage", narrator.name(), stage);
            None
        }
    }
}

/// Deterministic store-manager narratives built from the fact sheet
#[derive(Debug, Clone, Default)]
pub struct TemplateNarrator;

impl TemplateNarrator {
    fn fact<'a>(stage: Stage, facts: &'a NarrativeFacts, key: &str) -> Result<&'a str> {
        facts.get(key).ok_or_else(|| RetailError::NarrativeUnavailable {
            stage: stage.to_string(),
            reason: format!("missing fact '{}'", key),
        })
    }
}

impl Narrator for TemplateNarrator {
    fn narrate(&self, stage: Stage, facts: &NarrativeFacts) -> Result<String> {
        let text = match stage {
            Stage::Forecast => {
                let category = Self::fact(stage, facts, "category")?;
                let base = Self::fact(stage, facts, "base")?;
                let final_demand = Self::fact(stage, facts, "final")?;
                match facts.get("event") {
                    Some(event) => format!(
                        "Recent {} sales average {} units. With {} coming up (seasonal x{}, historical surge x{}), expected demand is {} units.",
                        category,
                        base,
                        event,
                        Self::fact(stage, facts, "seasonal_multiplier")?,
                        Self::fact(stage, facts, "surge_factor")?,
                        final_demand
                    ),
                    None => format!(
                        "Recent {} sales average {} units and no event is close, so expected demand is {} units.",
                        category, base, final_demand
                    ),
                }
            }
            Stage::Replenishment => format!(
                "Reorder {} units ({}); stockout risk is {}. Based on {}.",
                Self::fact(stage, facts, "reorder_qty")?,
                Self::fact(stage, facts, "timing")?,
                Self::fact(stage, facts, "stockout_risk")?,
                Self::fact(stage, facts, "factors")?
            ),
            Stage::Pricing => format!(
                "{} pricing recommended for {}: {} -> {} ({}% change). Driven by {}.",
                Self::fact(stage, facts, "strategy")?,
                Self::fact(stage, facts, "category")?,
                Self::fact(stage, facts, "current_price")?,
                Self::fact(stage, facts, "recommended_price")?,
                Self::fact(stage, facts, "change_pct")?,
                Self::fact(stage, facts, "factors")?
            ),
        };
        Ok(text)
    }

    fn name(&self) -> &str {
        "template"
    }
}

/// Narrator that is never available
#[derive(Debug, Clone, Default)]
pub struct SilentNarrator;

impl Narrator for SilentNarrator {
    fn narrate(&self, stage: Stage, _facts: &NarrativeFacts) -> Result<String> {
        Err(RetailError::NarrativeUnavailable {
            stage: stage.to_string(),
            reason: "narration disabled".to_string(),
        })
    }

    fn name(&self) -> &str {
        "silent"
    }
}
