// src/table/mod.rs
use anyhow::{bail, Context, Result};
use arrow::{
    array::{Array, ArrayRef, BooleanArray, StringArray, UInt32Array},
    compute::{cast, filter_record_batch, take},
    datatypes::{DataType, Field, Schema},
    record_batch::{RecordBatch, RecordBatchOptions},
};
use std::sync::Arc;

/// A loaded extract or merge result.
///
/// Every column is a nullable `Utf8` array; an empty CSV cell is a null.
#[derive(Debug, Clone)]
pub struct Table {
    batch: RecordBatch,
}

impl Table {
    /// A table with no columns and no rows, used for missing sources.
    pub fn empty() -> Self {
        Self {
            batch: RecordBatch::new_empty(Arc::new(Schema::empty())),
        }
    }

    /// Build a table from named string columns. All columns must be the same length.
    pub fn from_columns(columns: Vec<(String, Vec<Option<String>>)>) -> Result<Self> {
        let named = columns
            .into_iter()
            .map(|(name, values)| (name, Arc::new(StringArray::from(values)) as ArrayRef))
            .collect();
        Self::from_named_arrays(named)
    }

    /// Build a table from already-built arrays, casting anything that isn't `Utf8`.
    pub fn from_named_arrays(columns: Vec<(String, ArrayRef)>) -> Result<Self> {
        if columns.is_empty() {
            return Ok(Self::empty());
        }

        let mut fields = Vec::with_capacity(columns.len());
        let mut arrays = Vec::with_capacity(columns.len());
        for (name, array) in columns {
            let array = if array.data_type() == &DataType::Utf8 {
                array
            } else {
                cast(&array, &DataType::Utf8)
                    .with_context(|| format!("casting column `{}` to Utf8", name))?
            };
            fields.push(Field::new(name, DataType::Utf8, true));
            arrays.push(array);
        }

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
            .context("assembling table batch")?;
        Ok(Self { batch })
    }

    /// Wrap an arrow batch read from disk (e.g. parquet), normalising column types.
    pub fn from_batch(batch: RecordBatch) -> Result<Self> {
        let named = batch
            .schema()
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(f, a)| (f.name().clone(), a.clone()))
            .collect();
        Self::from_named_arrays(named)
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// True when there is nothing to join: no rows, or no columns at all.
    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0 || self.num_columns() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.batch.schema_ref().index_of(name).is_ok()
    }

    pub fn column(&self, name: &str) -> Option<&StringArray> {
        let idx = self.batch.schema_ref().index_of(name).ok()?;
        self.batch
            .column(idx)
            .as_any()
            .downcast_ref::<StringArray>()
    }

    /// Cell value, `None` for nulls and for unknown columns.
    pub fn value(&self, row: usize, name: &str) -> Option<&str> {
        let col = self.column(name)?;
        if row < col.len() && col.is_valid(row) {
            Some(col.value(row))
        } else {
            None
        }
    }

    /// Gather rows by index; null indices produce all-null rows.
    pub fn take_rows(&self, indices: &UInt32Array) -> Result<Self> {
        let columns = self
            .batch
            .columns()
            .iter()
            .map(|c| take(c.as_ref(), indices, None))
            .collect::<Result<Vec<_>, _>>()
            .context("gathering rows")?;
        let options = RecordBatchOptions::new().with_row_count(Some(indices.len()));
        let batch = RecordBatch::try_new_with_options(self.batch.schema(), columns, &options)
            .context("assembling gathered rows")?;
        Ok(Self { batch })
    }

    pub fn filter_rows(&self, mask: &BooleanArray) -> Result<Self> {
        if mask.len() != self.num_rows() {
            bail!(
                "filter mask has {} entries for {} rows",
                mask.len(),
                self.num_rows()
            );
        }
        let batch = filter_record_batch(&self.batch, mask).context("filtering rows")?;
        Ok(Self { batch })
    }

    /// Remove every column whose name matches `drop`.
    pub fn drop_columns(&self, drop: impl Fn(&str) -> bool) -> Result<Self> {
        let keep: Vec<usize> = self
            .batch
            .schema()
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| !drop(f.name()))
            .map(|(i, _)| i)
            .collect();
        let batch = self.batch.project(&keep).context("projecting columns")?;
        Ok(Self { batch })
    }

    /// First `n` rows (or fewer).
    pub fn head(&self, n: usize) -> Self {
        let len = n.min(self.num_rows());
        Self {
            batch: self.batch.slice(0, len),
        }
    }
}

/// Canonical text for a join key.
///
/// Keys are compared as text after trimming, except that integral numbers
/// compare by value so `"12"`, `"12.0"` and `" 12 "` all match.
pub fn normalize_key(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15 => {
            format!("{}", v as i64)
        }
        _ => trimmed.to_string(),
    }
}
