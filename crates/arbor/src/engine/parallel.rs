//! # Batch Parsing
//!
//! Parsing many inputs against one rule set.
//!
//! ## Overview
//!
//! The rule set is immutable and shared, and every input gets its own graph, so
//! inputs parse independently. With the `parallel` feature,
//! [`Parser::parse_batch`](super::Parser::parse_batch) spreads them over the
//! rayon thread pool; results come back in batch order.

use crate::error::ParseError;
use crate::forest::SharedPackedParseForest;
use std::time::Duration;

#[cfg(feature = "parallel")]
use super::Parser;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Outcome of parsing one input of a batch
#[derive(Debug)]
pub struct BatchResult {
    /// The input identifier (path or index)
    pub input_id: String,
    pub result: Result<SharedPackedParseForest, ParseError>,
    pub duration: Duration,
}

impl BatchResult {
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Inputs to parse: `(input_id, text)`
#[derive(Debug, Clone, Default)]
pub struct ParseBatch {
    pub inputs: Vec<(String, String)>,
}

impl ParseBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an input to the batch
    pub fn add(&mut self, input_id: impl Into<String>, text: impl Into<String>) {
        self.inputs.push((input_id.into(), text.into()));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

#[cfg(feature = "parallel")]
pub(super) fn parse_batch(parser: &Parser, goal: &str, batch: &ParseBatch) -> Vec<BatchResult> {
    tracing::debug!(goal, inputs = batch.len(), "batch parse started");
    batch
        .inputs
        .par_iter()
        .map(|(input_id, text)| {
            let started = std::time::Instant::now();
            let result = parser.parse(goal, text);
            BatchResult {
                input_id: input_id.clone(),
                result,
                duration: started.elapsed(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_collects_inputs() {
        let mut batch = ParseBatch::new();
        assert!(batch.is_empty());
        batch.add("one", "ab");
        batch.add("two", "a b");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.inputs[1].0, "two");
    }
}
