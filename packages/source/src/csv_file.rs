//! CSV reading with normalized headers.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::SourceError;
use crate::fields::normalize_header;

/// One CSV record keyed by normalized header name.
pub type CsvRow = BTreeMap<String, String>;

/// Iterator over the records of a CSV file with a header row.
///
/// Each item is either a row or the decoding error for that record;
/// iteration continues past bad records.
pub struct CsvRows<R> {
    headers: Vec<String>,
    records: csv::StringRecordsIntoIter<R>,
}

impl<R: Read> CsvRows<R> {
    /// Reads the header row and prepares to iterate records.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the header row cannot be read or is
    /// empty.
    pub fn from_reader(reader: R) -> Result<Self, SourceError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();
        if headers.iter().all(String::is_empty) {
            return Err(SourceError::Normalization {
                message: "CSV file contains no header row".to_string(),
            });
        }
        log::debug!("CSV headers: {}", headers.join(","));

        Ok(Self {
            headers,
            records: reader.into_records(),
        })
    }

    /// Normalized header names in file order.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl CsvRows<File> {
    /// Opens a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file cannot be opened or its header
    /// row cannot be read.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        Self::from_reader(File::open(path)?)
    }
}

impl<R: Read> Iterator for CsvRows<R> {
    type Item = Result<CsvRow, csv::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e)),
        };

        let row = self
            .headers
            .iter()
            .zip(record.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, value)| (header.clone(), value.to_string()))
            .collect();

        Some(Ok(row))
    }
}
