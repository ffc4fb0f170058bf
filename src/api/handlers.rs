//! HTTP request handlers for the Payroll Engine API.
//!
//! This module contains the handler functions for all API endpoints.

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::{
    ENGINE_VERSION, PayrollCalculator, TableSocialInsuranceCalculator, TableTaxCalculator,
    build_standard_remuneration_report, explore_brackets, import_resident_tax_notices,
    run_payroll,
};
use crate::models::ImportStatus;

use super::request::{
    BracketQuery, NoticeQuery, PayrollCalculationRequest, ResidentTaxImportRequest,
    StandardRemunerationRequest, ValidationIssue,
};
use super::response::{ApiError, ApiErrorResponse, ApiSuccess};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/employees", get(employees_handler))
        .route("/api/payroll/calculate", post(calculate_payroll_handler))
        .route("/api/tax/brackets", get(tax_brackets_handler))
        .route(
            "/api/standard-remuneration/evaluate",
            post(evaluate_standard_remuneration_handler),
        )
        .route("/api/resident-tax/import", post(import_resident_tax_handler))
        .route("/api/resident-tax/notice", get(resident_tax_notice_handler))
        .with_state(state)
}

fn success<T: Serialize>(data: T) -> Response {
    ApiSuccess::new(data).into_response()
}

fn json_rejection(correlation_id: Uuid, rejection: JsonRejection) -> Response {
    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") {
                ApiError::validation_error(vec![ValidationIssue::new("body", body_text)])
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    ApiErrorResponse::bad_request(error).into_response()
}

fn query_rejection(correlation_id: Uuid, rejection: QueryRejection) -> Response {
    let body_text = rejection.body_text();
    warn!(
        correlation_id = %correlation_id,
        error = %body_text,
        "Query string rejected"
    );
    ApiErrorResponse::bad_request(ApiError::invalid_query(body_text)).into_response()
}

fn validation_failure(correlation_id: Uuid, issues: Vec<ValidationIssue>) -> Response {
    warn!(
        correlation_id = %correlation_id,
        issues = issues.len(),
        "Request failed validation"
    );
    ApiErrorResponse::bad_request(ApiError::validation_error(issues)).into_response()
}

/// Handler for GET /health.
async fn health_handler(State(state): State<AppState>) -> Response {
    let schedule = state.config().schedule();
    success(serde_json::json!({
        "status": "ok",
        "engineVersion": ENGINE_VERSION,
        "schedule": schedule.code,
        "scheduleVersion": schedule.version,
    }))
}

/// Handler for GET /api/employees.
async fn employees_handler(State(state): State<AppState>) -> Response {
    success(state.gateway().employees())
}

/// Handler for POST /api/payroll/calculate.
///
/// Runs one payroll calculation for a stored employee.
async fn calculate_payroll_handler(
    State(state): State<AppState>,
    payload: Result<Json<PayrollCalculationRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing payroll calculation request");

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return json_rejection(correlation_id, rejection),
    };
    let issues = request.validate();
    if !issues.is_empty() {
        return validation_failure(correlation_id, issues);
    }
    let command = request.into_command();

    let tables = state.config().tables();
    let gateway = state.gateway();
    let calculator = PayrollCalculator::new(
        TableSocialInsuranceCalculator::new(tables),
        TableTaxCalculator::new(tables, gateway),
    );

    let start_time = Instant::now();
    match run_payroll(gateway, &calculator, &command) {
        Ok(result) => {
            info!(
                correlation_id = %correlation_id,
                employee_id = command.employee_id,
                gross_pay = %result.gross_pay,
                net_pay = %result.net_pay,
                duration_us = start_time.elapsed().as_micros(),
                "Payroll calculation completed"
            );
            success(result)
        }
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                employee_id = command.employee_id,
                error = %err,
                "Payroll calculation failed"
            );
            ApiErrorResponse::from(err).into_response()
        }
    }
}

/// Handler for GET /api/tax/brackets.
async fn tax_brackets_handler(
    State(state): State<AppState>,
    query: Result<Query<BracketQuery>, QueryRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return query_rejection(correlation_id, rejection),
    };
    if query.taxable_income.is_some_and(|income| income.is_sign_negative()) {
        return validation_failure(
            correlation_id,
            vec![ValidationIssue::new(
                "taxableIncome",
                "must be greater than or equal to 0",
            )],
        );
    }

    success(explore_brackets(
        state.config().tables().income_tax_brackets(),
        query.table_type,
        query.dependents,
        query.taxable_income,
    ))
}

/// Handler for POST /api/standard-remuneration/evaluate.
async fn evaluate_standard_remuneration_handler(
    State(state): State<AppState>,
    payload: Result<Json<StandardRemunerationRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing standard remuneration evaluation");

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return json_rejection(correlation_id, rejection),
    };
    let issues = request.validate();
    if !issues.is_empty() {
        return validation_failure(correlation_id, issues);
    }

    let employee_id = request.employee_id.unsigned_abs();
    match build_standard_remuneration_report(
        state.gateway(),
        state.config().tables().insurance_rates(),
        employee_id,
        request.reference_date,
    ) {
        Ok(report) => {
            info!(
                correlation_id = %correlation_id,
                employee_id,
                reference = %report.reference,
                indicators = report.evaluation.indicators.len(),
                "Standard remuneration evaluated"
            );
            success(report)
        }
        Err(err) => {
            warn!(correlation_id = %correlation_id, error = %err, "Evaluation failed");
            ApiErrorResponse::from(err).into_response()
        }
    }
}

/// Handler for POST /api/resident-tax/import.
///
/// Previews the notices in the CSV, or stores them when `commit` is set.
async fn import_resident_tax_handler(
    State(state): State<AppState>,
    payload: Result<Json<ResidentTaxImportRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing resident tax import");

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return json_rejection(correlation_id, rejection),
    };
    let issues = request.validate();
    if !issues.is_empty() {
        return validation_failure(correlation_id, issues);
    }

    match import_resident_tax_notices(state.gateway(), &request.csv, request.commit) {
        Ok(results) => {
            let stored = results
                .iter()
                .filter(|result| result.status != ImportStatus::Preview)
                .count();
            info!(
                correlation_id = %correlation_id,
                rows = results.len(),
                stored,
                commit = request.commit,
                "Resident tax import finished"
            );
            success(results)
        }
        Err(err) => {
            warn!(correlation_id = %correlation_id, error = %err, "Resident tax import failed");
            ApiErrorResponse::from(err).into_response()
        }
    }
}

/// Handler for GET /api/resident-tax/notice.
async fn resident_tax_notice_handler(
    State(state): State<AppState>,
    query: Result<Query<NoticeQuery>, QueryRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return query_rejection(correlation_id, rejection),
    };
    let issues = query.validate();
    if !issues.is_empty() {
        return validation_failure(correlation_id, issues);
    }

    success(
        state
            .gateway()
            .resident_tax_notices(query.employee_id.unsigned_abs()),
    )
}
