//! # Request Extraction
//!
//! Handlers take `Result<Json<T>, JsonRejection>` and
//! `Result<Query<T>, QueryRejection>` so that every rejection is reported in
//! the API's error envelope instead of axum's plain-text default.
//!
//! A body or query string that does not deserialize is a 400. One that
//! deserializes but carries an unacceptable value is a 422, reported by the
//! type's [`Validate`] impl.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::Json;

use crate::error::AppError;

/// Value rules checked after deserialization.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Unwrap a JSON body.
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    match result {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    }
}

/// Unwrap a JSON body and apply its [`Validate`] rules.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    validated(extract_json(result)?)
}

/// Unwrap a query string.
pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    match result {
        Ok(Query(value)) => Ok(value),
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    }
}

/// Unwrap a query string and apply its [`Validate`] rules.
pub fn extract_validated_query<T: Validate>(
    result: Result<Query<T>, QueryRejection>,
) -> Result<T, AppError> {
    validated(extract_query(result)?)
}

fn validated<T: Validate>(value: T) -> Result<T, AppError> {
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}
