use serde::{Deserialize, Serialize};

/// One left-join applied to the running merge result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinStep {
    /// Source key of the right-hand table.
    pub source: String,
    pub left_on: String,
    pub right_on: String,
    /// Appended to left columns whose name also appears on the right.
    #[serde(default)]
    pub left_suffix: String,
    /// Appended to right columns whose name also appears on the left.
    pub right_suffix: String,
}

impl JoinStep {
    /// Join on a column both sides share, keeping left names as they are.
    pub fn on(source: &str, key: &str) -> Self {
        Self {
            source: source.to_string(),
            left_on: key.to_string(),
            right_on: key.to_string(),
            left_suffix: String::new(),
            right_suffix: format!("_{}", source),
        }
    }

    pub fn keys(source: &str, left_on: &str, right_on: &str) -> Self {
        Self {
            left_on: left_on.to_string(),
            right_on: right_on.to_string(),
            ..Self::on(source, left_on)
        }
    }

    pub fn suffixes(mut self, left: &str, right: &str) -> Self {
        self.left_suffix = left.to_string();
        self.right_suffix = right.to_string();
        self
    }
}

/// Columns removed once every join has run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropRule {
    #[serde(default)]
    pub suffixes: Vec<String>,
    #[serde(default)]
    pub names: Vec<String>,
}

impl Default for DropRule {
    fn default() -> Self {
        Self {
            suffixes: vec!["_proposal".to_string()],
            names: ["id_company", "id_address", "id_benefit", "id_contact", "id_multimedia"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl DropRule {
    pub fn matches(&self, column: &str) -> bool {
        self.names.iter().any(|n| n == column)
            || self.suffixes.iter().any(|s| column.ends_with(s.as_str()))
    }
}

/// Base table plus ordered join steps and the final drop rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPlan {
    pub base: String,
    pub steps: Vec<JoinStep>,
    #[serde(default)]
    pub drop: DropRule,
}

impl JoinPlan {
    /// The consolidation used for the program's exports.
    ///
    /// `multimedia` fans out one row per media item, so it only joins when asked.
    pub fn standard(include_multimedia: bool) -> Self {
        let mut steps = vec![
            JoinStep::keys("proposal", "proposal_id", "id").suffixes("_project", "_proposal"),
            JoinStep::on("company", "project_id"),
            JoinStep::on("address", "proposal_id"),
            JoinStep::on("benefit", "proposal_id"),
            JoinStep::on("contact", "proposal_id"),
        ];
        if include_multimedia {
            steps.push(JoinStep::on("multimedia", "proposal_id"));
        }
        steps.push(JoinStep::keys("benefit_address", "id_benefit", "benefit_id"));

        Self {
            base: "project".to_string(),
            steps,
            drop: DropRule::default(),
        }
    }
}
