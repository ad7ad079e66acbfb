// src/merge/mod.rs
pub mod join;
pub mod plan;

use anyhow::Result;
use std::{collections::BTreeMap, fmt};
use tracing::{info, warn};

use crate::table::Table;
pub use join::left_join;
pub use plan::{DropRule, JoinPlan, JoinStep};

/// What happened to a single join step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Applied { rows_before: usize, rows_after: usize },
    /// The right-hand source was missing or had no rows.
    SkippedEmpty,
    /// One side lacks the join column.
    SkippedMissingKey { column: String },
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Applied {
                rows_before,
                rows_after,
            } => write!(f, "joined ({} → {} rows)", rows_before, rows_after),
            StepOutcome::SkippedEmpty => write!(f, "skipped (empty source)"),
            StepOutcome::SkippedMissingKey { column } => {
                write!(f, "skipped (no `{}` column)", column)
            }
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct MergeReport {
    pub steps: Vec<(String, StepOutcome)>,
    pub dropped: Vec<String>,
}

impl MergeReport {
    pub fn outcome(&self, source: &str) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|(s, _)| s == source)
            .map(|(_, o)| o)
    }
}

/// Run `plan` over the loaded sources.
///
/// Starts from the base table (empty when missing), applies each step in
/// order, then removes the columns named by the drop rule.
#[tracing::instrument(level = "info", skip_all, fields(base = %plan.base))]
pub fn run_plan(tables: &BTreeMap<String, Table>, plan: &JoinPlan) -> Result<(Table, MergeReport)> {
    let mut merged = tables.get(&plan.base).cloned().unwrap_or_else(Table::empty);
    let mut report = MergeReport::default();
    info!(rows = merged.num_rows(), "base table `{}`", plan.base);

    for step in &plan.steps {
        let readiness = match tables.get(&step.source) {
            None => Readiness::Empty,
            Some(right) if right.is_empty() => Readiness::Empty,
            Some(_) if !merged.has_column(&step.left_on) => {
                Readiness::MissingKey(step.left_on.clone())
            }
            Some(right) if !right.has_column(&step.right_on) => {
                Readiness::MissingKey(step.right_on.clone())
            }
            Some(right) => Readiness::Ready(right),
        };

        let outcome = match readiness {
            Readiness::Empty => {
                info!(source = %step.source, "source empty; skipping join");
                StepOutcome::SkippedEmpty
            }
            Readiness::MissingKey(column) => {
                warn!(source = %step.source, column = %column, "join column missing; skipping join");
                StepOutcome::SkippedMissingKey { column }
            }
            Readiness::Ready(right) => {
                let rows_before = merged.num_rows();
                merged = left_join(
                    &merged,
                    right,
                    &step.left_on,
                    &step.right_on,
                    (step.left_suffix.as_str(), step.right_suffix.as_str()),
                )?;
                info!(
                    source = %step.source,
                    rows_before,
                    rows_after = merged.num_rows(),
                    columns = merged.num_columns(),
                    "joined"
                );
                StepOutcome::Applied {
                    rows_before,
                    rows_after: merged.num_rows(),
                }
            }
        };
        report.steps.push((step.source.clone(), outcome));
    }

    report.dropped = merged
        .column_names()
        .into_iter()
        .filter(|c| plan.drop.matches(c))
        .collect();
    merged = merged.drop_columns(|c| plan.drop.matches(c))?;
    info!(
        dropped = report.dropped.len(),
        rows = merged.num_rows(),
        columns = merged.num_columns(),
        "merge complete"
    );

    Ok((merged, report))
}

enum Readiness<'a> {
    Empty,
    MissingKey(String),
    Ready(&'a Table),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::read_table;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,proposal_merge::merge=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn csv(text: &str) -> Table {
        read_table(text.as_bytes(), "fixture").unwrap()
    }

    fn fixture() -> BTreeMap<String, Table> {
        let mut t = BTreeMap::new();
        t.insert(
            "project".to_string(),
            csv("id,proposal_id,project_id,description,total,required_investment,type,category\n\
                 10,1,100,Proj A,1000.5,500,Industrial,Tech\n\
                 11,2,101,Proj B,2000,800,Comercio,Food\n\
                 12,3,102,Proj C,,,x,y\n"),
        );
        t.insert(
            "proposal".to_string(),
            csv("id,name,description,status,created_at,completed_at\n\
                 1,Alpha,PA,Approved,2023-10-05 14:30:00,2023-12-01 09:00:00\n\
                 2,Beta,PB,Pending,2024-01-15 08:00:00,\n"),
        );
        t.insert(
            "company".to_string(),
            csv("id,project_id,company_name,federal_tax_id,description\n\
                 200,100,ACME,12.345.678/0001-90,Company desc\n\
                 201,101,Foods SA,98.765.432/0001-10,\n"),
        );
        t.insert(
            "address".to_string(),
            csv("id,proposal_id,city_id\n300,1,4106902\n301,2,4113700\n"),
        );
        t.insert(
            "benefit".to_string(),
            csv("id,proposal_id,description,identification\n\
                 400,1,Benefit A,IDA\n\
                 401,1,Benefit A2,IDA2\n"),
        );
        t.insert(
            "contact".to_string(),
            csv("id,proposal_id,email\n500,2,b@example.com\n"),
        );
        t.insert("multimedia".to_string(), Table::empty());
        t.insert(
            "benefit_address".to_string(),
            csv("id,benefit_id,street\n600,400,Rua A\n"),
        );
        t
    }

    #[test]
    fn standard_plan_produces_reference_layout() -> Result<()> {
        init_test_logging();
        let (merged, report) = run_plan(&fixture(), &JoinPlan::standard(false))?;

        assert_eq!(
            merged.column_names(),
            vec![
                "id_project",
                "proposal_id",
                "project_id",
                "description_project",
                "total",
                "required_investment",
                "type",
                "category",
                "name",
                "status",
                "created_at",
                "completed_at",
                "id",
                "company_name",
                "federal_tax_id",
                "description",
                "city_id",
                "description_benefit",
                "identification",
                "email",
                "id_benefit_address",
                "benefit_id",
                "street",
            ]
        );
        assert_eq!(
            report.dropped,
            vec![
                "id_proposal",
                "description_proposal",
                "id_address",
                "id_benefit",
                "id_contact"
            ]
        );

        // proposal 1 fans out across its two benefits
        assert_eq!(merged.num_rows(), 4);
        let pids: Vec<_> = (0..4).map(|i| merged.value(i, "proposal_id")).collect();
        assert_eq!(pids, vec![Some("1"), Some("1"), Some("2"), Some("3")]);
        assert_eq!(merged.value(0, "street"), Some("Rua A"));
        assert_eq!(merged.value(1, "street"), None);
        assert_eq!(merged.value(1, "description_benefit"), Some("Benefit A2"));
        assert_eq!(merged.value(2, "email"), Some("b@example.com"));
        assert_eq!(merged.value(3, "name"), None);
        assert_eq!(merged.value(0, "company_name"), Some("ACME"));
        Ok(())
    }

    #[test]
    fn empty_sources_are_skipped() -> Result<()> {
        init_test_logging();
        let mut tables = fixture();
        tables.insert("contact".to_string(), Table::empty());
        tables.remove("address");

        let (merged, report) = run_plan(&tables, &JoinPlan::standard(true))?;
        assert_eq!(report.outcome("contact"), Some(&StepOutcome::SkippedEmpty));
        assert_eq!(report.outcome("address"), Some(&StepOutcome::SkippedEmpty));
        assert_eq!(report.outcome("multimedia"), Some(&StepOutcome::SkippedEmpty));
        assert!(!merged.has_column("email"));
        assert!(!merged.has_column("city_id"));
        Ok(())
    }

    #[test]
    fn benefit_address_needs_benefit_ids() -> Result<()> {
        init_test_logging();
        let mut tables = fixture();
        tables.insert("benefit".to_string(), Table::empty());

        let (merged, report) = run_plan(&tables, &JoinPlan::standard(false))?;
        assert_eq!(
            report.outcome("benefit_address"),
            Some(&StepOutcome::SkippedMissingKey {
                column: "id_benefit".to_string()
            })
        );
        assert!(!merged.has_column("street"));
        assert_eq!(merged.num_rows(), 3);
        Ok(())
    }

    #[test]
    fn missing_base_yields_empty_result() -> Result<()> {
        init_test_logging();
        let mut tables = fixture();
        tables.remove("project");

        let (merged, report) = run_plan(&tables, &JoinPlan::standard(false))?;
        assert!(merged.is_empty());
        assert_eq!(merged.num_columns(), 0);
        assert!(matches!(
            report.outcome("proposal"),
            Some(StepOutcome::SkippedMissingKey { .. })
        ));
        Ok(())
    }
}
