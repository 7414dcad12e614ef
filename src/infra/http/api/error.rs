use std::error::Error as StdError;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use postdesk_api_types::{ApiErrorBody, ApiErrorMessage, FieldViolation};

use crate::application::error::ErrorReport;

const REPORT_SOURCE: &str = "infra::http::api";

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const VALIDATION: &str = "validation_failed";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const SESSION_EXPIRED: &str = "session_expired";
    pub const SESSION_REVOKED: &str = "session_revoked";
    pub const NOT_FOUND: &str = "not_found";
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";
    pub const INTERNAL: &str = "internal_error";
    pub const UPLOAD: &str = "upload_error";
    pub const IMAGE_DELETE: &str = "image_delete_error";
}

/// JSON error response. Whatever lands in `chain` is logged, never sent.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    violations: Option<Vec<FieldViolation>>,
    chain: Vec<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: &'static str) -> Self {
        Self {
            status,
            code,
            message,
            violations: None,
            chain: Vec::new(),
        }
    }

    pub fn bad_request(message: &'static str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message)
    }

    pub fn validation(violations: Vec<FieldViolation>) -> Self {
        let mut error = Self::new(
            StatusCode::BAD_REQUEST,
            codes::VALIDATION,
            "Post failed validation",
        );
        error.chain = violations
            .iter()
            .map(|violation| format!("{}: {}", violation.field, violation.message))
            .collect();
        error.violations = Some(violations);
        error
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            "Authentication required",
        )
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message)
    }

    pub fn internal(code: &'static str, message: &'static str, err: &dyn StdError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, message).with_source(err)
    }

    /// Record `err` and its sources for the response logger.
    pub fn with_source(mut self, err: &dyn StdError) -> Self {
        self.chain = ErrorReport::from_error(REPORT_SOURCE, self.status, err).messages;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.chain = vec![detail.into()];
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                violations: self.violations,
            },
        };
        let mut response = (self.status, Json(body)).into_response();

        let report = if self.chain.is_empty() {
            ErrorReport::from_message(
                REPORT_SOURCE,
                self.status,
                format!("{}: {}", self.code, self.message),
            )
        } else {
            ErrorReport {
                source: REPORT_SOURCE,
                status: self.status,
                messages: self.chain,
            }
        };
        report.attach(&mut response);
        response
    }
}
