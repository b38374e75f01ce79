//! Two-stage content-safety pipeline.
//!
//! `ModerationPipeline::screen` runs the lexical `PatternFilter` first and
//! only consults the `ClassifierGate` when the filter is clear, so obviously
//! unsafe input never costs a network call.

pub mod classifier;
pub mod pattern;

use tracing::info;

use chatgate_types::moderation::Rejection;

use self::classifier::ClassifierGate;
use self::pattern::PatternFilter;

/// Pattern filter followed by classifier gate.
pub struct ModerationPipeline {
    filter: PatternFilter,
    gate: ClassifierGate,
}

impl ModerationPipeline {
    pub fn new(filter: PatternFilter, gate: ClassifierGate) -> Self {
        Self { filter, gate }
    }

    /// Screen a candidate message. `Ok(())` means it may reach inference.
    pub async fn screen(&self, text: &str) -> Result<(), Rejection> {
        if let Some(pattern) = self.filter.first_match(text) {
            info!(pattern, "Message blocked by denylist");
            return Err(Rejection::UnsafePattern);
        }

        let verdict = self.gate.classify(text).await;
        if !self.gate.is_safe(&verdict) {
            info!(verdict = %verdict, "Message blocked by classifier");
            return Err(Rejection::ClassifierRejected { verdict });
        }

        Ok(())
    }
}
