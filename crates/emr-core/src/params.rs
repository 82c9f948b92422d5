//! Spark `--conf` parameter model.
//!
//! A [`ParameterSet`] carries one common mapping plus optional overrides per
//! backend. Rendering for a backend applies the overrides on top of the
//! common entries and produces a single `--conf k=v --conf ...` string.

use std::collections::HashMap;


use crate::{BackendKind, Result};

/// Common and per-backend Spark configuration entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    common: Vec<(String, String)>,
    overrides: HashMap<BackendKind, Vec<(String, String)>>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry shared by every backend.
    pub fn with_common(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        upsert(&mut self.common, key.into(), value.into());
        self
    }

    /// Add an entry that only applies to `backend`, overriding a common entry with the same key.
    pub fn with_override(
        mut self,
        backend: BackendKind,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        upsert(
            self.overrides.entry(backend).or_default(),
            key.into(),
            value.into(),
        );
        self
    }

    /// Merged entries for a backend, in insertion order.
    pub fn entries_for(&self, backend: BackendKind) -> Vec<(String, String)> {
        let mut merged = self.common.clone();
        if let Some(overrides) = self.overrides.get(&backend) {
            for (k, v) in overrides {
                upsert(&mut merged, k.clone(), v.clone());
            }
        }
        merged
    }

    /// Render the merged entries for `backend_id` as spark-submit flags.
    pub fn render(&self, backend_id: &str) -> Result<String> {
        let backend: BackendKind = backend_id.parse()?;
        Ok(self.render_for(backend))
    }

    pub fn render_for(&self, backend: BackendKind) -> String {
        self.entries_for(backend)
            .iter()
            .map(|(k, v)| format!("--conf {}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.common.is_empty() && self.overrides.values().all(|o| o.is_empty())
    }
}

// Replaces the value in place so an overridden key keeps its original position.
fn upsert(entries: &mut Vec<(String, String)>, key: String, value: String) {
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some(entry) => entry.1 = value,
        None => entries.push((key, value)),
    }
}
