use crate::api::v1::handler::ApiResponse;
use crate::application_port::VerificationError;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    if let Some(err) = err.find::<ApiError>() {
        let status = match err.code {
            ApiErrorCode::DeliveryFailed | ApiErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::OK,
        };
        let json = warp::reply::json(&ApiResponse::<()>::err(err.clone()));
        Ok(warp::reply::with_status(json, status))
    } else {
        let json = warp::reply::json(&ApiResponse::<()>::err(ApiError {
            code: ApiErrorCode::InternalError,
            message: format!("Unhandled error: {:?}", err),
        }));
        Ok(warp::reply::with_status(
            json,
            StatusCode::INTERNAL_SERVER_ERROR,
        ))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

/// Stable wire codes; clients key their next action off these.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorCode {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("code must be exactly six digits")]
    InvalidCode,
    #[error("no pending code for this address")]
    NotFound,
    #[error("code expired")]
    Expired,
    #[error("attempt budget exhausted")]
    AttemptsExhausted,
    #[error("incorrect code")]
    Mismatch,
    #[error("could not send code, try again")]
    DeliveryFailed,
    #[error("internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }
}

impl reject::Reject for ApiError {}

impl From<VerificationError> for ApiError {
    fn from(error: VerificationError) -> Self {
        let code = match &error {
            VerificationError::InvalidEmail => ApiErrorCode::InvalidEmail,
            VerificationError::InvalidCode => ApiErrorCode::InvalidCode,
            VerificationError::NotFound => ApiErrorCode::NotFound,
            VerificationError::Expired => ApiErrorCode::Expired,
            VerificationError::AttemptsExhausted => ApiErrorCode::AttemptsExhausted,
            VerificationError::Mismatch { .. } => ApiErrorCode::Mismatch,
            VerificationError::Delivery(_) => ApiErrorCode::DeliveryFailed,
            VerificationError::Store(e) => ApiErrorCode::internal(e),
            VerificationError::InternalError(e) => ApiErrorCode::internal(e),
        };
        let message = match code {
            // Infra details stay out of responses.
            ApiErrorCode::InternalError => code.to_string(),
            ApiErrorCode::DeliveryFailed => code.to_string(),
            _ => error.to_string(),
        };
        ApiError { code, message }
    }
}
