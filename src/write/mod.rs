// src/write/mod.rs
use anyhow::{Context, Result};
use arrow::csv::WriterBuilder;
use parquet::{
    arrow::ArrowWriter,
    basic::Compression,
    file::properties::WriterProperties,
};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::info;

use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Parquet,
}

impl OutputFormat {
    /// `.parquet` selects parquet; everything else is CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => OutputFormat::Parquet,
            _ => OutputFormat::Csv,
        }
    }
}

/// Write the consolidated table to `path`, returning the file size in bytes.
///
/// The file is written next to its destination under a hidden temp name and
/// renamed into place, so readers never see a half-written dataset.
#[tracing::instrument(level = "info", skip(table, path), fields(path = %path.display()))]
pub fn write_consolidated(table: &Table, path: &Path) -> Result<u64> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "consolidated".to_string());
    let tmp_path = dir.join(format!(".{}.tmp", file_name));

    let format = OutputFormat::from_path(path);
    let file =
        File::create(&tmp_path).with_context(|| format!("creating {}", tmp_path.display()))?;

    let written = match format {
        _ if table.num_columns() == 0 => {
            drop(file);
            Ok(())
        }
        OutputFormat::Csv => write_csv(table, file),
        OutputFormat::Parquet => write_parquet(table, file),
    }
    .and_then(|()| {
        fs::rename(&tmp_path, path)
            .with_context(|| format!("renaming {} -> {}", tmp_path.display(), path.display()))
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    let size = fs::metadata(path)
        .with_context(|| format!("reading metadata of {}", path.display()))?
        .len();
    info!(
        ?format,
        rows = table.num_rows(),
        columns = table.num_columns(),
        bytes = size,
        "wrote consolidated dataset"
    );
    Ok(size)
}

fn write_csv(table: &Table, file: File) -> Result<()> {
    let mut out = BufWriter::new(file);
    {
        let mut writer = WriterBuilder::new().with_header(true).build(&mut out);
        writer
            .write(table.batch())
            .context("writing CSV batch")?;
    }
    out.flush().context("flushing CSV output")?;
    Ok(())
}

fn write_parquet(table: &Table, file: File) -> Result<()> {
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, table.batch().schema(), Some(props))
        .context("creating parquet writer")?;
    writer.write(table.batch()).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}
