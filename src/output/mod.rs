//! Output formatters for canonical query results.
//!
//! - JSON for automation and scripting
//! - CSV for spreadsheet import

pub mod csv;
pub mod json;

pub use csv::CsvOutput;
pub use json::JsonOutput;
