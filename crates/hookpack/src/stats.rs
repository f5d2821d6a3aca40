//! Pass results.

use std::sync::Arc;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use serde::Serialize;

use crate::compilation::{Compilation, Module};

/// Result of one completed pass.
#[derive(Debug, Clone)]
pub struct Stats {
    compilation: Arc<Compilation>,
    start_time: Instant,
    end_time: Instant,
}

impl Stats {
    pub fn new(compilation: Arc<Compilation>, start_time: Instant, end_time: Instant) -> Self {
        Self {
            compilation,
            start_time,
            end_time,
        }
    }

    pub fn compilation(&self) -> &Arc<Compilation> {
        &self.compilation
    }

    pub fn duration(&self) -> Duration {
        self.end_time.saturating_duration_since(self.start_time)
    }

    pub fn has_errors(&self) -> bool {
        !self.compilation.errors().is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.compilation.warnings().is_empty()
    }

    /// Serializable summary of the pass.
    pub fn to_json(&self) -> StatsJson {
        let compilation = &self.compilation;
        StatsJson {
            name: compilation.name().map(str::to_string),
            time: self.duration().as_millis() as u64,
            entries: compilation
                .entries()
                .into_iter()
                .map(|(name, entry)| {
                    let requests = entry.dependencies.into_iter().map(|d| d.request).collect();
                    (name, requests)
                })
                .collect(),
            modules: compilation.modules(),
            assets: compilation
                .assets()
                .into_iter()
                .map(|(name, content)| AssetSummary {
                    name,
                    size: content.len(),
                })
                .collect(),
            errors: compilation.errors(),
            warnings: compilation.warnings(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Pass duration in milliseconds
    pub time: u64,
    /// Seeded requests by entry name
    pub entries: IndexMap<String, Vec<String>>,
    pub modules: Vec<Module>,
    pub assets: Vec<AssetSummary>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetSummary {
    pub name: String,
    pub size: usize,
}

/// Results of every child of a multi-target build, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct MultiStats {
    stats: Vec<Stats>,
}

impl MultiStats {
    pub fn new(stats: Vec<Stats>) -> Self {
        Self { stats }
    }

    pub fn children(&self) -> &[Stats] {
        &self.stats
    }

    pub fn has_errors(&self) -> bool {
        self.stats.iter().any(Stats::has_errors)
    }

    pub fn has_warnings(&self) -> bool {
        self.stats.iter().any(Stats::has_warnings)
    }

    pub fn to_json(&self) -> Vec<StatsJson> {
        self.stats.iter().map(Stats::to_json).collect()
    }
}
