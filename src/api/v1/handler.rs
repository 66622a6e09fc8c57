use super::error::*;
use crate::application_port::{IssueInput, VerificationService, VerifyInput};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: ApiError) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SendOtpResponse {
    pub expires_at: DateTime<Utc>,
}

pub async fn send_otp(
    body: SendOtpRequest,
    verification_service: Arc<dyn VerificationService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let receipt = verification_service
        .request_code(IssueInput { email: body.email })
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    let response = SendOtpResponse {
        expires_at: receipt.expires_at,
    };
    Ok(warp::reply::json(&ApiResponse::ok(response)))
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyOtpResponse {
    pub verified: bool,
}

pub async fn verify_otp(
    body: VerifyOtpRequest,
    verification_service: Arc<dyn VerificationService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    verification_service
        .verify(VerifyInput {
            email: body.email,
            code: body.code,
        })
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(VerifyOtpResponse {
        verified: true,
    })))
}
