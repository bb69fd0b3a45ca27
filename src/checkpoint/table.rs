use anyhow::{bail, Context, Result};
use csv::StringRecord;
use std::path::Path;

/// An input or checkpoint CSV loaded into memory, addressed by column name
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    headers: Vec<String>,
    records: Vec<StringRecord>,
}

impl CsvTable {
    pub fn read(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read CSV header from {}", path.display()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut records = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record
                .with_context(|| format!("Failed to read row {} of {}", idx + 1, path.display()))?;
            records.push(record);
        }

        Ok(Self { headers, records })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Fail with the available columns listed when `name` is missing
    pub fn require_column(&self, name: &str) -> Result<usize> {
        match self.column_index(name) {
            Some(idx) => Ok(idx),
            None => bail!(
                "Missing required column '{}' (found: {})",
                name,
                self.headers.join(", ")
            ),
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = TableRow<'_>> {
        self.records.iter().map(move |record| TableRow { table: self, record })
    }
}

/// A borrowed row with by-name access
#[derive(Debug, Clone, Copy)]
pub struct TableRow<'a> {
    table: &'a CsvTable,
    record: &'a StringRecord,
}

impl<'a> TableRow<'a> {
    /// Cell value, or None when the column is absent or the cell is blank
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = self.table.column_index(column)?;
        let value = self.record.get(idx)?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// Raw cell by position, empty string when the row is short
    pub fn cell(&self, idx: usize) -> &'a str {
        self.record.get(idx).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_read_by_column_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input.csv");
        fs::write(&path, "name, affiliation\nAda Lovelace,\n\"Hopper, Grace\",Navy\n").unwrap();

        let table = CsvTable::read(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.column_index("affiliation"), Some(1));

        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows[0].get("name"), Some("Ada Lovelace"));
        assert_eq!(rows[0].get("affiliation"), None);
        assert_eq!(rows[1].get("name"), Some("Hopper, Grace"));
        assert_eq!(rows[1].get("missing"), None);
    }

    #[test]
    fn test_require_column_lists_headers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input.csv");
        fs::write(&path, "Title,URL\n").unwrap();

        let table = CsvTable::read(&path).unwrap();
        assert!(table.is_empty());
        let err = table.require_column("title").unwrap_err().to_string();
        assert!(err.contains("Title, URL"));
    }
}
