//! # Input Sources
//!
//! Anything that yields [`AddressRecord`]s implements [`AddressSource`]:
//! * [`csv_file::CsvSource`] reads a CSV file with a `subnet` column.
//! * [`random::RandomSource`] synthesizes host routes for testing.
//!
//! Sources never fail: problems are reported and an empty list comes back.
//! [`collect`] falls back to random records when a CSV yields nothing.

use std::path::Path;

use addrbatch_common::address::record::AddressRecord;
use addrbatch_common::{info, warn};

pub mod csv_file;
pub mod random;

pub use csv_file::{CsvSource, InputError};
pub use random::{DEFAULT_COUNT, RandomSource};

pub trait AddressSource {
    fn load(&self) -> Vec<AddressRecord>;
}

/// Today's date as stamped into generated comments.
pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Records from `csv_path`, or `count` random ones when there is no path or
/// the file produced no usable record.
pub fn collect(csv_path: Option<&Path>, count: usize) -> Vec<AddressRecord> {
    let Some(path) = csv_path else {
        info!("No CSV file specified. Generating random addresses...");
        return RandomSource::new(count).load();
    };

    info!("Reading addresses from {}...", path.display());
    let records = CsvSource::new(path).load();
    if records.is_empty() {
        warn!("No valid addresses found in CSV. Using random addresses.");
        return RandomSource::new(count).load();
    }

    records
}
