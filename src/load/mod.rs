// src/load/mod.rs
pub mod utils;

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, ErrorKind, Read},
    path::Path,
};
use tracing::{info, warn};

use crate::table::Table;
use utils::{clean_header, dedupe_headers};

/// One named extract: the key the merge plan refers to, and the CSV file it lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub key: String,
    pub file_name: String,
}

impl SourceSpec {
    pub fn new(key: &str, file_name: &str) -> Self {
        Self {
            key: key.to_string(),
            file_name: file_name.to_string(),
        }
    }
}

/// The program's export set, in load order.
pub fn default_sources() -> Vec<SourceSpec> {
    vec![
        SourceSpec::new("proposal", "Proposal_Data_proposal.csv"),
        SourceSpec::new("project", "Proposal_Data_proposal_project.csv"),
        SourceSpec::new("company", "Proposal_Data_proposal_project_company.csv"),
        SourceSpec::new("address", "Proposal_Data_proposal_address.csv"),
        SourceSpec::new("benefit", "Proposal_Data_proposal_benefit.csv"),
        SourceSpec::new("contact", "Proposal_Data_proposal_contact.csv"),
        SourceSpec::new("multimedia", "Proposal_Data_proposal_multimedia.csv"),
        SourceSpec::new(
            "benefit_address",
            "Proposal_Data_proposal_benefit_address.csv",
        ),
    ]
}

/// Parse a headered CSV stream into a [`Table`].
///
/// Empty cells become nulls. Rows shorter than the header are padded with
/// nulls, longer rows are cut at the header width.
pub fn read_table<R: Read>(reader: R, label: &str) -> Result<Table> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .with_context(|| format!("reading header of {}", label))?
        .clone();
    let names = dedupe_headers(headers.iter().map(clean_header));
    if names.is_empty() || (names.len() == 1 && names[0].is_empty()) {
        return Ok(Table::empty());
    }

    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
    for (idx, result) in rdr.records().enumerate() {
        let record =
            result.with_context(|| format!("CSV parse error in {} at record {}", label, idx))?;
        for (i, col) in columns.iter_mut().enumerate() {
            let cell = record.get(i).filter(|s| !s.is_empty()).map(str::to_string);
            col.push(cell);
        }
    }

    Table::from_columns(names.into_iter().zip(columns).collect())
}

/// Load one CSV file. A missing file is reported as `Ok(None)`.
#[tracing::instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_table<P: AsRef<Path>>(path: P) -> Result<Option<Table>> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("opening {}", path.display()));
        }
    };
    let table = read_table(BufReader::new(file), &path.display().to_string())?;
    Ok(Some(table))
}

/// Load every source in `sources` from `dir`, keyed by [`SourceSpec::key`].
///
/// Missing files become [`Table::empty`] so one absent extract never sinks the run.
#[tracing::instrument(level = "info", skip(dir, sources), fields(dir = %dir.as_ref().display()))]
pub fn load_sources<P: AsRef<Path>>(
    dir: P,
    sources: &[SourceSpec],
) -> Result<BTreeMap<String, Table>> {
    let dir = dir.as_ref();
    let loaded = sources
        .par_iter()
        .map(|spec| -> Result<(String, Table)> {
            let path = dir.join(&spec.file_name);
            let table = match load_table(&path)? {
                Some(t) => {
                    info!(
                        source = %spec.key,
                        rows = t.num_rows(),
                        columns = t.num_columns(),
                        "loaded {}",
                        spec.file_name
                    );
                    t
                }
                None => {
                    warn!(source = %spec.key, "{} not found; skipping", spec.file_name);
                    Table::empty()
                }
            };
            Ok((spec.key.clone(), table))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(loaded.into_iter().collect())
}
