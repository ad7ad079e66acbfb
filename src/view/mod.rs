// src/view/mod.rs
pub mod date_parser;
pub mod render;
pub mod select;
pub mod session;

use anyhow::{bail, Context, Result};
use arrow::{array::BooleanArray, compute::concat_batches};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Serialize;
use std::{collections::HashSet, fs::File, path::Path};
use tracing::{info, warn};

use crate::{
    load::load_table,
    table::{normalize_key, Table},
    write::OutputFormat,
};
use date_parser::parse_datetime;

/// The consolidated dataset prepared for browsing.
///
/// Only rows with a parseable `created_at` are kept; their submission
/// timestamps are held alongside the table.
#[derive(Debug, Clone)]
pub struct Dataset {
    table: Table,
    created: Vec<NaiveDateTime>,
    completed: Vec<Option<NaiveDateTime>>,
}

impl Dataset {
    /// Read a consolidated CSV or parquet file.
    #[tracing::instrument(level = "info", skip(path), fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("consolidated file not found: {}", path.display());
        }
        let table = match OutputFormat::from_path(path) {
            OutputFormat::Csv => load_table(path)?.unwrap_or_else(Table::empty),
            OutputFormat::Parquet => read_parquet(path)?,
        };
        Self::from_table(table)
    }

    /// Coerce the date columns and drop rows without a submission date.
    pub fn from_table(table: Table) -> Result<Self> {
        let Some(created_col) = table.column("created_at") else {
            bail!("consolidated dataset has no `created_at` column");
        };
        let parsed: Vec<Option<NaiveDateTime>> = created_col
            .iter()
            .map(|v| v.and_then(parse_datetime))
            .collect();

        let mask = BooleanArray::from(parsed.iter().map(Option::is_some).collect::<Vec<_>>());
        let dropped = parsed.iter().filter(|p| p.is_none()).count();
        if dropped > 0 {
            warn!(dropped, "rows without a valid created_at were removed");
        }

        let table = table.filter_rows(&mask)?;
        let created: Vec<NaiveDateTime> = parsed.into_iter().flatten().collect();
        let completed = (0..table.num_rows())
            .map(|row| table.value(row, "completed_at").and_then(parse_datetime))
            .collect();

        info!(rows = table.num_rows(), "dataset ready");
        Ok(Self {
            table,
            created,
            completed,
        })
    }

    pub fn len(&self) -> usize {
        self.table.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Submission years, most recent first.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self
            .created
            .iter()
            .map(|c| c.year())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        years.sort_unstable_by(|a, b| b.cmp(a));
        years
    }

    /// Days in `year` with at least one submission, oldest first.
    pub fn days_in_year(&self, year: i32) -> Vec<NaiveDate> {
        let mut days: Vec<NaiveDate> = self
            .created
            .iter()
            .filter(|c| c.year() == year)
            .map(|c| c.date())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        days.sort_unstable();
        days
    }

    /// Distinct proposal ids submitted on `day`, in the order they first appear.
    pub fn proposals_on(&self, day: NaiveDate) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for (row, created) in self.created.iter().enumerate() {
            if created.date() != day {
                continue;
            }
            if let Some(id) = self.table.value(row, "proposal_id") {
                if seen.insert(normalize_key(id)) {
                    ids.push(id.to_string());
                }
            }
        }
        ids
    }

    /// The first row carrying `proposal_id`, as a typed record.
    pub fn proposal(&self, proposal_id: &str) -> Option<ProposalView> {
        let wanted = normalize_key(proposal_id);
        let ids = self.table.column("proposal_id")?;
        let row = ids
            .iter()
            .position(|v| v.map(normalize_key).as_deref() == Some(wanted.as_str()))?;
        Some(self.row_view(row))
    }

    fn row_view(&self, row: usize) -> ProposalView {
        let text = |name: &str| self.table.value(row, name).map(str::to_string);
        let number = |name: &str| {
            self.table
                .value(row, name)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
        };

        ProposalView {
            proposal_id: text("proposal_id").unwrap_or_default(),
            name: text("name"),
            description_project: text("description_project"),
            description_benefit: text("description_benefit"),
            total: number("total"),
            required_investment: number("required_investment"),
            project_type: text("type"),
            identification: text("identification"),
            category: text("category"),
            status: text("status"),
            created_at: self.created.get(row).copied(),
            completed_at: self.completed.get(row).copied().flatten(),
            company_name: text("company_name"),
            city_id: text("city_id"),
            federal_tax_id: text("federal_tax_id"),
        }
    }
}

/// The fields a renderer shows for one proposal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposalView {
    pub proposal_id: String,
    pub name: Option<String>,
    pub description_project: Option<String>,
    pub description_benefit: Option<String>,
    pub total: Option<f64>,
    pub required_investment: Option<f64>,
    #[serde(rename = "type")]
    pub project_type: Option<String>,
    pub identification: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub company_name: Option<String>,
    pub city_id: Option<String>,
    pub federal_tax_id: Option<String>,
}

fn read_parquet(path: &Path) -> Result<Table> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("reading parquet metadata of {}", path.display()))?;
    let schema = builder.schema().clone();
    let reader = builder.build().context("building parquet reader")?;
    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .context("reading parquet batches")?;
    let batch = concat_batches(&schema, &batches).context("concatenating parquet batches")?;
    Table::from_batch(batch)
}
