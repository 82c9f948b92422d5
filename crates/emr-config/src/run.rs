//! Saved run defaults.
//!
//! ```kdl
//! run {
//!     application-id "00f1abcdexample"
//!     job-role "arn:aws:iam::123456789012:role/emr-job"
//!     s3-code-uri "s3://bucket/code/pyspark/"
//! }
//! ```

use crate::{ConfigError, ConfigResult};
use kdl::{KdlDocument, KdlEntry, KdlNode};
use std::path::Path;
use tracing::{debug, warn};

/// Location of the config file, relative to the project directory.
pub const DEFAULT_CONFIG_PATH: &str = ".emr/config.kdl";

/// Defaults for the `run` and `deploy` commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfig {
    pub application_id: Option<String>,
    pub cluster_id: Option<String>,
    pub virtual_cluster_id: Option<String>,
    pub job_role: Option<String>,
    pub s3_code_uri: Option<String>,
    pub s3_logs_uri: Option<String>,
    pub release_label: Option<String>,
    pub region: Option<String>,
    pub profile: Option<String>,
}

impl RunConfig {
    fn fields(&self) -> [(&'static str, &Option<String>); 9] {
        [
            ("application-id", &self.application_id),
            ("cluster-id", &self.cluster_id),
            ("virtual-cluster-id", &self.virtual_cluster_id),
            ("job-role", &self.job_role),
            ("s3-code-uri", &self.s3_code_uri),
            ("s3-logs-uri", &self.s3_logs_uri),
            ("release-label", &self.release_label),
            ("region", &self.region),
            ("profile", &self.profile),
        ]
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut Option<String>> {
        match name {
            "application-id" => Some(&mut self.application_id),
            "cluster-id" => Some(&mut self.cluster_id),
            "virtual-cluster-id" => Some(&mut self.virtual_cluster_id),
            "job-role" => Some(&mut self.job_role),
            "s3-code-uri" => Some(&mut self.s3_code_uri),
            "s3-logs-uri" => Some(&mut self.s3_logs_uri),
            "release-label" => Some(&mut self.release_label),
            "region" => Some(&mut self.region),
            "profile" => Some(&mut self.profile),
            _ => None,
        }
    }

    /// Overlay every value set in `other` onto this config.
    pub fn merge(&mut self, other: RunConfig) {
        let RunConfig {
            application_id,
            cluster_id,
            virtual_cluster_id,
            job_role,
            s3_code_uri,
            s3_logs_uri,
            release_label,
            region,
            profile,
        } = other;
        let updates = [
            ("application-id", application_id),
            ("cluster-id", cluster_id),
            ("virtual-cluster-id", virtual_cluster_id),
            ("job-role", job_role),
            ("s3-code-uri", s3_code_uri),
            ("s3-logs-uri", s3_logs_uri),
            ("release-label", release_label),
            ("region", region),
            ("profile", profile),
        ];
        for (name, value) in updates {
            if let (Some(value), Some(slot)) = (value, self.field_mut(name)) {
                *slot = Some(value);
            }
        }
    }

    /// Read the config at `path`.
    ///
    /// A missing file yields the defaults. A file that fails to parse is
    /// reported and ignored so a broken config never blocks a run.
    pub fn load(path: &Path) -> RunConfig {
        if !path.is_file() {
            debug!(path = %path.display(), "No config file found");
            return RunConfig::default();
        }

        let parsed = std::fs::read_to_string(path)
            .map_err(ConfigError::from)
            .and_then(|content| parse_run_config(&content));
        match parsed {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "There was an error parsing the config file");
                RunConfig::default()
            }
        }
    }

    /// Write the config to `path`, overwriting any existing file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, render_run_config(self))?;
        Ok(())
    }
}

/// Parse run defaults from KDL text. Unknown nodes are ignored.
pub fn parse_run_config(kdl: &str) -> ConfigResult<RunConfig> {
    let doc: KdlDocument = kdl.parse()?;
    let mut config = RunConfig::default();
    let mut seen_run = false;

    for node in doc.nodes() {
        if node.name().value() != "run" {
            continue;
        }
        if seen_run {
            return Err(ConfigError::Duplicate("run".to_string()));
        }
        seen_run = true;

        if let Some(children) = node.children() {
            for child in children.nodes() {
                let name = child.name().value();
                let Some(slot) = config.field_mut(name) else {
                    continue;
                };
                let value = get_first_string_arg(child).ok_or_else(|| ConfigError::InvalidValue {
                    field: name.to_string(),
                    message: "expected a string value".to_string(),
                })?;
                *slot = Some(value);
            }
        }
    }

    Ok(config)
}

/// Render run defaults as KDL text, skipping unset values.
pub fn render_run_config(config: &RunConfig) -> String {
    let mut run = KdlNode::new("run");
    let children = run.ensure_children();
    for (name, value) in config.fields() {
        if let Some(value) = value {
            let mut node = KdlNode::new(name);
            node.push(KdlEntry::new(value.as_str()));
            children.nodes_mut().push(node);
        }
    }

    let mut doc = KdlDocument::new();
    doc.nodes_mut().push(run);
    doc.autoformat();
    doc.to_string()
}

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}
