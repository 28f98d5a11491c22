use std::path::{Path, PathBuf};

use addrbatch_common::address::record::{AddressRecord, host_name};
use addrbatch_common::{error, warn};
use thiserror::Error;

use super::{AddressSource, today};

#[derive(Debug, Error)]
pub enum InputError {
    #[error("file {} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("CSV file must contain a 'subnet' column")]
    MissingSubnetColumn,
    #[error("error reading CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Reads address records from a headed CSV file.
///
/// Only `subnet` is required. `name`, `comment` and `color` are optional,
/// other columns are ignored. Rows without a subnet are skipped.
pub struct CsvSource {
    path: PathBuf,
    date: String,
}

impl CsvSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            date: today(),
        }
    }

    /// Overrides the date used in default comments.
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    /// All records, or the first error. Never a partial list.
    pub fn read(&self) -> Result<Vec<AddressRecord>, InputError> {
        if !self.path.exists() {
            return Err(InputError::NotFound(self.path.clone()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)?;

        let headers = reader.headers()?.clone();
        let column = |name: &str| headers.iter().position(|h| h.trim() == name);

        let subnet_col = column("subnet").ok_or(InputError::MissingSubnetColumn)?;
        let name_col = column("name");
        let comment_col = column("comment");
        let color_col = column("color");

        let mut records = Vec::new();
        for (idx, row) in reader.records().enumerate() {
            let line = idx + 1;
            let row = row?;
            let field = |col: Option<usize>| {
                col.and_then(|c| row.get(c))
                    .filter(|value| !value.trim().is_empty())
            };

            let Some(subnet) = field(Some(subnet_col)) else {
                warn!("Line {line}: Missing 'subnet' field, line ignored.");
                continue;
            };

            let name = field(name_col).map_or_else(|| host_name(line), str::to_string);
            let comment = field(comment_col)
                .map_or_else(|| format!("Imported from CSV on {}", self.date), str::to_string);

            let mut record = AddressRecord::new(name, subnet, comment);
            record.color = field(color_col).and_then(|c| c.trim().parse::<i64>().ok());
            records.push(record);
        }

        Ok(records)
    }
}

impl AddressSource for CsvSource {
    fn load(&self) -> Vec<AddressRecord> {
        match self.read() {
            Ok(records) => records,
            Err(e) => {
                error!("Error: {e}");
                Vec::new()
            }
        }
    }
}
