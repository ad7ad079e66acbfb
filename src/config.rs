// src/config.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use crate::{
    load::{default_sources, SourceSpec},
    merge::{DropRule, JoinPlan},
};

pub const DEFAULT_OUTPUT_NAME: &str = "dados_consolidados.csv";

/// Settings for a merge run, optionally read from YAML.
///
/// ```yaml
/// data_dir: exports/2024
/// output: out/dados_consolidados.parquet
/// include_multimedia: false
/// sources:
///   contact: contacts_fixed.csv
/// drop:
///   suffixes: [_proposal]
///   names: [id_company, id_address]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    pub data_dir: PathBuf,
    /// Defaults to `<data_dir>/dados_consolidados.csv`.
    pub output: Option<PathBuf>,
    /// Per-source file name overrides, keyed like the join plan.
    pub sources: BTreeMap<String, String>,
    pub include_multimedia: bool,
    pub drop: DropRule,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output: None,
            sources: BTreeMap::new(),
            include_multimedia: false,
            drop: DropRule::default(),
        }
    }
}

impl MergeConfig {
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let cfg = serde_yaml::from_str(text)?;
        Ok(cfg)
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DEFAULT_OUTPUT_NAME))
    }

    /// The default export set with any overrides applied; unknown keys are appended.
    pub fn source_specs(&self) -> Vec<SourceSpec> {
        let mut specs = default_sources();
        for (key, file_name) in &self.sources {
            match specs.iter_mut().find(|s| &s.key == key) {
                Some(spec) => spec.file_name = file_name.clone(),
                None => specs.push(SourceSpec::new(key, file_name)),
            }
        }
        specs
    }

    pub fn plan(&self) -> JoinPlan {
        JoinPlan {
            drop: self.drop.clone(),
            ..JoinPlan::standard(self.include_multimedia)
        }
    }
}
