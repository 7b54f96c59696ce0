// ABOUTME: Converts gateway failures into HTTP responses with a stable JSON body.
// ABOUTME: The status code follows the error kind; runtime text only appears as detail.

use crate::gateway::{ErrorKind, GatewayError};
use crate::validate::FieldError;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    Gateway(GatewayError),
    Body(JsonRejection),
    Query(QueryRejection),
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        ApiError::Gateway(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::Body(e)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::Query(e)
    }
}

/// The failure body every endpoint returns.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub outcome_unknown: bool,
}

impl ApiError {
    fn body(&self) -> ErrorBody {
        match self {
            ApiError::Gateway(e) => ErrorBody {
                error: e.to_string(),
                kind: e.kind(),
                detail: e.detail().map(str::to_string),
                fields: e.fields().map(<[FieldError]>::to_vec),
                outcome_unknown: e.outcome_unknown(),
            },
            ApiError::Body(rejection) => ErrorBody {
                error: "request body is not a valid request".to_string(),
                kind: ErrorKind::Validation,
                detail: Some(rejection.body_text()),
                fields: None,
                outcome_unknown: false,
            },
            ApiError::Query(rejection) => ErrorBody {
                error: "query string is not valid".to_string(),
                kind: ErrorKind::Validation,
                detail: Some(rejection.body_text()),
                fields: None,
                outcome_unknown: false,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = self.body();
        let status = StatusCode::from_u16(body.kind.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match body.kind {
            ErrorKind::Unknown | ErrorKind::TransportUnavailable => {
                tracing::error!(kind = %body.kind, detail = ?body.detail, "{}", body.error)
            }
            _ => tracing::warn!(kind = %body.kind, detail = ?body.detail, "{}", body.error),
        }

        (status, Json(body)).into_response()
    }
}
