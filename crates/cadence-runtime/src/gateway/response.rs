use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use cadence_core::{CadenceError, Result};

/// Envelope for every gateway response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl ApiResponse {
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(error: ApiError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }

    /// Serialize an engine result into the envelope.
    pub fn from_result<T: Serialize>(result: Result<T>) -> Self {
        match result.and_then(|v| Ok(serde_json::to_value(v)?)) {
            Ok(data) => Self::success(data),
            Err(e) => Self::error(e.into()),
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status = if self.success {
            StatusCode::OK
        } else {
            self.error
                .as_ref()
                .map(|e| e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        };

        (status, Json(self)).into_response()
    }
}

/// Error information carried by a failed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new("INVALID_ARGUMENT", message)
    }

    pub fn status_code(&self) -> StatusCode {
        match self.code.as_str() {
            "INVALID_ARGUMENT" => StatusCode::BAD_REQUEST,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "DEPENDENCY_NOT_SATISFIED" | "INVALID_TRANSITION" => StatusCode::UNPROCESSABLE_ENTITY,
            "CONFLICT" => StatusCode::CONFLICT,
            "PERSISTENCE_ERROR" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CadenceError> for ApiError {
    fn from(err: CadenceError) -> Self {
        let error = Self::new(err.code(), err.to_string());
        match err {
            CadenceError::DependencyNotSatisfied {
                step,
                dependency,
                status,
            } => error.with_details(json!({
                "step": step,
                "dependency": dependency,
                "dependencyStatus": status,
            })),
            CadenceError::InvalidTransition { step, from, to } => error.with_details(json!({
                "step": step,
                "from": from,
                "to": to,
            })),
            _ => error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::StepStatus;

    #[test]
    fn test_status_codes() {
        let cases = [
            ("INVALID_ARGUMENT", StatusCode::BAD_REQUEST),
            ("NOT_FOUND", StatusCode::NOT_FOUND),
            ("DEPENDENCY_NOT_SATISFIED", StatusCode::UNPROCESSABLE_ENTITY),
            ("INVALID_TRANSITION", StatusCode::UNPROCESSABLE_ENTITY),
            ("CONFLICT", StatusCode::CONFLICT),
            ("PERSISTENCE_ERROR", StatusCode::SERVICE_UNAVAILABLE),
            ("NOTIFICATION_ERROR", StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (code, status) in cases {
            assert_eq!(ApiError::new(code, "x").status_code(), status, "{code}");
        }
    }

    #[test]
    fn test_dependency_error_details() {
        let err: ApiError = CadenceError::DependencyNotSatisfied {
            step: "grade_entry".into(),
            dependency: "exam_session".into(),
            status: StepStatus::Pending,
        }
        .into();

        assert_eq!(err.code, "DEPENDENCY_NOT_SATISFIED");
        let details = err.details.unwrap();
        assert_eq!(details["dependency"], "exam_session");
        assert_eq!(details["dependencyStatus"], "pending");
    }

    #[test]
    fn test_from_result() {
        let ok = ApiResponse::from_result(Ok(vec![1, 2]));
        assert!(ok.success);
        assert_eq!(ok.data.unwrap(), json!([1, 2]));

        let err = ApiResponse::from_result::<()>(Err(CadenceError::NotFound("x".into())));
        assert!(!err.success);
        assert_eq!(err.error.unwrap().code, "NOT_FOUND");
    }
}
