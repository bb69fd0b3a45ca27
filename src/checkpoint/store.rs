use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use super::{CsvRecord, CsvTable};

/// An append-only CSV output that records which natural keys are done
#[derive(Debug)]
pub struct CheckpointLog {
    path: PathBuf,
    processed: HashSet<String>,
    // For each column of an existing file whose header differs from the
    // expected one, the index of the matching expected column.
    layout: Option<Vec<Option<usize>>>,
}

impl CheckpointLog {
    /// Open an existing checkpoint, or create it containing only `header`.
    ///
    /// A missing or empty file is initialized; an existing file must contain
    /// `key_column`, whose non-blank values become the processed-key set.
    /// Rows appended to a file with a different header are written under the
    /// file's own columns, matched by name.
    pub fn open(path: &Path, header: &[&str], key_column: &str) -> Result<Self> {
        let is_empty = match fs::metadata(path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };

        if is_empty {
            Self::initialize(path, header)?;
            info!("Created checkpoint {}", path.display());
            return Ok(Self {
                path: path.to_path_buf(),
                processed: HashSet::new(),
                layout: None,
            });
        }

        let table = CsvTable::read(path)
            .with_context(|| format!("Failed to load checkpoint {}", path.display()))?;
        let key_idx = table
            .require_column(key_column)
            .with_context(|| format!("Checkpoint {} has an unexpected header", path.display()))?;

        let layout = if table.headers().iter().map(String::as_str).eq(header.iter().copied()) {
            None
        } else {
            Some(column_layout(path, table.headers(), header))
        };

        let processed: HashSet<String> = table
            .rows()
            .map(|row| row.cell(key_idx).trim().to_string())
            .filter(|key| !key.is_empty())
            .collect();

        info!(
            "Loaded checkpoint {}: {} rows, {} processed keys",
            path.display(),
            table.len(),
            processed.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            processed,
            layout,
        })
    }

    fn initialize(path: &Path, header: &[&str]) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let file = File::create(path)
            .with_context(|| format!("Failed to create checkpoint: {}", path.display()))?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(header)?;
        writer.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn processed_keys(&self) -> &HashSet<String> {
        &self.processed
    }

    pub fn is_processed(&self, key: &str) -> bool {
        self.processed.contains(key)
    }

    /// Append a batch of records and mark their keys processed
    pub fn append<R: CsvRecord>(&mut self, records: &[R]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| {
                format!("Failed to open checkpoint for append: {}", self.path.display())
            })?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

        for record in records {
            let row = record.to_row();
            match &self.layout {
                Some(layout) => writer.write_record(arrange_row(layout, row))?,
                None => writer.write_record(row)?,
            }
        }
        writer
            .flush()
            .with_context(|| format!("Failed to flush checkpoint: {}", self.path.display()))?;

        for record in records {
            self.processed.insert(record.key().to_string());
        }

        debug!("Appended {} rows to {}", records.len(), self.path.display());
        Ok(records.len())
    }
}

/// Map each column of an existing checkpoint to its position in `expected`
fn column_layout(path: &Path, existing: &[String], expected: &[&str]) -> Vec<Option<usize>> {
    let missing: Vec<&str> = expected
        .iter()
        .copied()
        .filter(|name| !existing.iter().any(|col| col == name))
        .collect();
    if missing.is_empty() {
        warn!(
            "Checkpoint {} orders its columns differently; appending by column name",
            path.display()
        );
    } else {
        warn!(
            "Checkpoint {} lacks columns {:?}; their values will not be written",
            path.display(),
            missing
        );
    }

    existing
        .iter()
        .map(|col| expected.iter().position(|name| name == col))
        .collect()
}

fn arrange_row(layout: &[Option<usize>], mut row: Vec<String>) -> Vec<String> {
    layout
        .iter()
        .map(|idx| {
            idx.and_then(|i| row.get_mut(i).map(std::mem::take))
                .unwrap_or_default()
        })
        .collect()
}

/// Keep the first item of every key that has not been processed, in input order
pub fn resume_filter<T, F>(items: Vec<T>, key: F, processed: &HashSet<String>) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let mut seen: HashSet<String> = HashSet::new();
    items
        .into_iter()
        .filter(|item| {
            let k = key(item);
            !processed.contains(k) && seen.insert(k.to_string())
        })
        .collect()
}
