use anyhow::{anyhow, Result};
use arrow::array::{ArrayRef, UInt32Array};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::table::{normalize_key, Table};

/// Left join `right` onto `left`.
///
/// Every left row survives in order. A left row matching k right rows becomes
/// k rows (right order); a row matching nothing gets nulls on the right side.
/// Null keys never match. When both key names are equal the key column is
/// emitted once, taken from the left. Names present on both sides get
/// `suffixes.0` on the left and `suffixes.1` on the right; if a name still
/// collides with an earlier output column, the later column replaces it.
pub fn left_join(
    left: &Table,
    right: &Table,
    left_on: &str,
    right_on: &str,
    suffixes: (&str, &str),
) -> Result<Table> {
    let left_keys = left
        .column(left_on)
        .ok_or_else(|| anyhow!("left table has no `{}` column", left_on))?;
    let right_keys = right
        .column(right_on)
        .ok_or_else(|| anyhow!("right table has no `{}` column", right_on))?;

    let mut index: HashMap<String, Vec<u32>> = HashMap::new();
    for (j, key) in right_keys.iter().enumerate() {
        if let Some(k) = key {
            index.entry(normalize_key(k)).or_default().push(j as u32);
        }
    }

    let mut left_idx: Vec<u32> = Vec::with_capacity(left.num_rows());
    let mut right_idx: Vec<Option<u32>> = Vec::with_capacity(left.num_rows());
    for (i, key) in left_keys.iter().enumerate() {
        match key.and_then(|k| index.get(&normalize_key(k))) {
            Some(matches) => {
                for &j in matches {
                    left_idx.push(i as u32);
                    right_idx.push(Some(j));
                }
            }
            None => {
                left_idx.push(i as u32);
                right_idx.push(None);
            }
        }
    }

    let left_rows = left.take_rows(&UInt32Array::from(left_idx))?;
    let right_rows = right.take_rows(&UInt32Array::from(right_idx))?;

    let shared_key = left_on == right_on;
    let left_names = left.column_names();
    let right_names: Vec<(usize, String)> = right
        .column_names()
        .into_iter()
        .enumerate()
        .filter(|(_, n)| !(shared_key && n == right_on))
        .collect();

    let left_set: HashSet<&str> = left_names.iter().map(String::as_str).collect();
    let right_set: HashSet<&str> = right_names.iter().map(|(_, n)| n.as_str()).collect();

    let mut out: Vec<(String, ArrayRef)> =
        Vec::with_capacity(left_names.len() + right_names.len());

    for (name, array) in left_names.iter().zip(left_rows.batch().columns()) {
        let name = if right_set.contains(name.as_str()) {
            format!("{}{}", name, suffixes.0)
        } else {
            name.clone()
        };
        push_column(&mut out, name, array.clone());
    }
    for (pos, name) in &right_names {
        let name = if left_set.contains(name.as_str()) {
            format!("{}{}", name, suffixes.1)
        } else {
            name.clone()
        };
        push_column(&mut out, name, right_rows.batch().column(*pos).clone());
    }

    Table::from_named_arrays(out)
}

fn push_column(out: &mut Vec<(String, ArrayRef)>, name: String, array: ArrayRef) {
    if let Some(slot) = out.iter_mut().find(|(n, _)| *n == name) {
        debug!(column = %name, "column name collision; keeping the later column");
        slot.1 = array;
    } else {
        out.push((name, array));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(cols: &[(&str, &[Option<&str>])]) -> Table {
        Table::from_columns(
            cols.iter()
                .map(|(n, v)| {
                    (
                        n.to_string(),
                        v.iter().map(|c| c.map(str::to_string)).collect(),
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn keeps_unmatched_left_rows() -> Result<()> {
        let left = table(&[("pid", &[Some("1"), Some("2")])]);
        let right = table(&[("pid", &[Some("1")]), ("city", &[Some("Curitiba")])]);

        let out = left_join(&left, &right, "pid", "pid", ("", "_r"))?;
        assert_eq!(out.column_names(), vec!["pid", "city"]);
        assert_eq!(out.num_rows(), 2);
        assert_eq!(out.value(0, "city"), Some("Curitiba"));
        assert_eq!(out.value(1, "city"), None);
        assert_eq!(out.value(1, "pid"), Some("2"));
        Ok(())
    }

    #[test]
    fn one_to_many_fans_out_in_right_order() -> Result<()> {
        let left = table(&[("pid", &[Some("1"), Some("2")]), ("tag", &[Some("a"), Some("b")])]);
        let right = table(&[
            ("pid", &[Some("2"), Some("1"), Some("2")]),
            ("n", &[Some("x"), Some("y"), Some("z")]),
        ]);

        let out = left_join(&left, &right, "pid", "pid", ("", "_r"))?;
        assert_eq!(out.num_rows(), 3);
        let ns: Vec<_> = (0..3).map(|i| out.value(i, "n")).collect();
        assert_eq!(ns, vec![Some("y"), Some("x"), Some("z")]);
        let tags: Vec<_> = (0..3).map(|i| out.value(i, "tag")).collect();
        assert_eq!(tags, vec![Some("a"), Some("b"), Some("b")]);
        Ok(())
    }

    #[test]
    fn distinct_keys_are_both_kept_and_overlaps_suffixed() -> Result<()> {
        let left = table(&[
            ("id", &[Some("10")]),
            ("proposal_id", &[Some("1")]),
            ("description", &[Some("project")]),
        ]);
        let right = table(&[
            ("id", &[Some("1")]),
            ("description", &[Some("proposal")]),
            ("name", &[Some("Alpha")]),
        ]);

        let out = left_join(&left, &right, "proposal_id", "id", ("_project", "_proposal"))?;
        assert_eq!(
            out.column_names(),
            vec![
                "id_project",
                "proposal_id",
                "description_project",
                "id_proposal",
                "description_proposal",
                "name"
            ]
        );
        assert_eq!(out.value(0, "id_proposal"), Some("1"));
        assert_eq!(out.value(0, "description_proposal"), Some("proposal"));
        Ok(())
    }

    #[test]
    fn null_keys_never_match() -> Result<()> {
        let left = table(&[("k", &[None, Some("1")])]);
        let right = table(&[("k", &[None, Some("1")]), ("v", &[Some("null"), Some("one")])]);

        let out = left_join(&left, &right, "k", "k", ("", "_r"))?;
        assert_eq!(out.num_rows(), 2);
        assert_eq!(out.value(0, "v"), None);
        assert_eq!(out.value(1, "v"), Some("one"));
        Ok(())
    }

    #[test]
    fn numeric_keys_match_across_formatting() -> Result<()> {
        let left = table(&[("k", &[Some("7.0")])]);
        let right = table(&[("k", &[Some("7")]), ("v", &[Some("seven")])]);

        let out = left_join(&left, &right, "k", "k", ("", "_r"))?;
        assert_eq!(out.value(0, "v"), Some("seven"));
        assert_eq!(out.value(0, "k"), Some("7.0"));
        Ok(())
    }

    #[test]
    fn later_column_wins_on_residual_collision() -> Result<()> {
        // `x` on both sides renames the right one to `x_r`, which the left already has.
        let left = table(&[("k", &[Some("1")]), ("x", &[Some("lx")]), ("x_r", &[Some("old")])]);
        let right = table(&[("k", &[Some("1")]), ("x", &[Some("rx")])]);

        let out = left_join(&left, &right, "k", "k", ("", "_r"))?;
        assert_eq!(out.column_names(), vec!["k", "x", "x_r"]);
        assert_eq!(out.value(0, "x"), Some("lx"));
        assert_eq!(out.value(0, "x_r"), Some("rx"));
        Ok(())
    }

    #[test]
    fn missing_key_is_an_error() {
        let left = table(&[("a", &[Some("1")])]);
        let right = table(&[("b", &[Some("1")])]);
        assert!(left_join(&left, &right, "a", "a", ("", "_r")).is_err());
        assert!(left_join(&left, &right, "zz", "b", ("", "_r")).is_err());
    }

    #[test]
    fn empty_left_yields_no_rows() -> Result<()> {
        let left = table(&[("k", &[])]);
        let right = table(&[("k", &[Some("1")]), ("v", &[Some("x")])]);
        let out = left_join(&left, &right, "k", "k", ("", "_r"))?;
        assert_eq!(out.num_rows(), 0);
        assert_eq!(out.column_names(), vec!["k", "v"]);
        Ok(())
    }
}
