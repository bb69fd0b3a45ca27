use anyhow::Result;
use log::info;

use super::{CheckpointLog, CsvRecord};

/// Buffers records and appends them to a checkpoint every `batch_size` records
pub struct BatchWriter<'a, R: CsvRecord> {
    log: &'a mut CheckpointLog,
    batch_size: usize,
    pending: Vec<R>,
    written: usize,
}

impl<'a, R: CsvRecord> BatchWriter<'a, R> {
    pub fn new(log: &'a mut CheckpointLog, batch_size: usize) -> Self {
        Self {
            log,
            batch_size: batch_size.max(1),
            pending: Vec::new(),
            written: 0,
        }
    }

    pub fn push(&mut self, record: R) -> Result<()> {
        self.pending.push(record);
        self.flush_if_full()
    }

    /// Add every record produced for one input key before checking the batch
    /// size, so a key is never split across two flushes.
    pub fn push_all(&mut self, records: Vec<R>) -> Result<()> {
        self.pending.extend(records);
        self.flush_if_full()
    }

    fn flush_if_full(&mut self) -> Result<()> {
        if self.pending.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        info!("Saving batch of {} records...", self.pending.len());
        self.written += self.log.append(&self.pending)?;
        self.pending.clear();
        Ok(())
    }

    /// Flush the remainder and return the number of records written
    pub fn finish(mut self) -> Result<usize> {
        self.flush()?;
        Ok(self.written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    struct Key(String);

    impl CsvRecord for Key {
        const HEADER: &'static [&'static str] = &["key"];
        const KEY_COLUMN: &'static str = "key";

        fn key(&self) -> &str {
            &self.0
        }

        fn to_row(&self) -> Vec<String> {
            vec![self.0.clone()]
        }
    }

    fn line_count(path: &std::path::Path) -> usize {
        fs::read_to_string(path).unwrap().lines().count()
    }

    #[test]
    fn test_flushes_at_batch_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut log = CheckpointLog::open(&path, Key::HEADER, Key::KEY_COLUMN).unwrap();

        let mut writer = BatchWriter::new(&mut log, 2);
        writer.push(Key("a".into())).unwrap();
        assert_eq!(line_count(&path), 1);
        writer.push(Key("b".into())).unwrap();
        assert_eq!(line_count(&path), 3);
        writer.push(Key("c".into())).unwrap();
        assert_eq!(writer.finish().unwrap(), 3);
        assert_eq!(line_count(&path), 4);
    }

    #[test]
    fn test_push_all_keeps_group_together() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut log = CheckpointLog::open(&path, Key::HEADER, Key::KEY_COLUMN).unwrap();

        let mut writer = BatchWriter::new(&mut log, 1);
        writer
            .push_all(vec![Key("seed".into()), Key("seed".into()), Key("seed".into())])
            .unwrap();
        assert_eq!(line_count(&path), 4);
        assert_eq!(writer.finish().unwrap(), 3);
        assert!(log.is_processed("seed"));
    }
}
