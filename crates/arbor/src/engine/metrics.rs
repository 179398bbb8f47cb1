use std::time::Duration;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Counters collected while parsing one input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ParseMetrics {
    pub parse_time: Duration,
    /// Frontier passes, skip sub-parses included
    pub seasons: usize,
    pub growing_nodes: usize,
    pub complete_nodes: usize,
    pub bud_cache_hits: usize,
    pub bud_cache_misses: usize,
    /// Positions at which a skip sequence was looked for
    pub skip_parses: usize,
}
