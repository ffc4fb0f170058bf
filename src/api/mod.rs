//! HTTP API module for the Payroll Engine.
//!
//! This module provides the REST endpoints for payroll calculation,
//! withholding table lookup, standard remuneration evaluation, and
//! resident tax notice import.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{
    BracketQuery, ItemRequest, NoticeQuery, PayrollCalculationRequest, ResidentTaxImportRequest,
    StandardRemunerationRequest, ValidationIssue,
};
pub use response::{ApiError, ApiErrorResponse, ApiSuccess};
pub use state::AppState;
