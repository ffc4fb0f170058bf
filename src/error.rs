//! Error types for the Payroll Engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur during payroll calculation.

use thiserror::Error;

/// The main error type for the Payroll Engine.
///
/// All operations in the engine return this error type, making it easy
/// to handle errors consistently throughout the application.
///
/// # Example
///
/// ```
/// use payroll_engine::error::EngineError;
///
/// let error = EngineError::EmployeeNotFound { employee_id: 42 };
/// assert_eq!(error.to_string(), "Employee 42 not found");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// No employee exists with the given id.
    #[error("Employee {employee_id} not found")]
    EmployeeNotFound {
        /// The id that was looked up.
        employee_id: u64,
    },

    /// A request field failed validation.
    #[error("Invalid field '{field}': {message}")]
    InvalidInput {
        /// The field that was invalid.
        field: String,
        /// A description of what made the field invalid.
        message: String,
    },

    /// The resident tax CSV header is missing a required column.
    #[error("CSV のヘッダーに {header} が含まれていません")]
    CsvHeaderMissing {
        /// The missing column name.
        header: String,
    },

    /// A resident tax CSV data row could not be read.
    #[error("{row} 行目: {message}")]
    InvalidCsvRow {
        /// The 1-based data row number (the header is not counted).
        row: usize,
        /// A description of what was wrong with the row.
        message: String,
    },

    /// A general calculation error occurred.
    #[error("Calculation error: {message}")]
    CalculationError {
        /// A description of the calculation error.
        message: String,
    },
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
