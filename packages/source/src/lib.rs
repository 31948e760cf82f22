#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Trip file reading and row normalization.
//!
//! Monthly trip exports have changed column names several times. Rows are
//! read with normalized headers ([`csv_file`]), each logical field is looked
//! up through the ordered alias table in `fields.toml` ([`fields`]), and the
//! result is either a [`bikeshare_trip_models::RawTrip`] or a
//! [`normalize::SkipReason`].

pub mod csv_file;
pub mod fields;
pub mod normalize;
pub mod parsing;
pub mod progress;

/// Errors that can occur while reading trip files.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// I/O error (file open/read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decoding failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The field alias table could not be parsed.
    #[error("Field table error: {0}")]
    FieldTable(#[from] toml::de::Error),

    /// Data normalization error.
    #[error("Normalization error: {message}")]
    Normalization {
        /// Description of what went wrong.
        message: String,
    },
}
