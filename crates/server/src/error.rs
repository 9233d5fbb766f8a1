use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mirrorlens_core::error::{ApiError, ErrorEnvelope};
use mirrorlens_providers::search::SearchError;
use mirrorlens_providers::{AuthError, FetchError, NormalizeError};
use tracing::warn;

/// Newtype wrapper so we can implement `IntoResponse` in this crate.
pub struct AppError(pub ApiError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            warn!(error = %self.0, "request failed");
        }
        let envelope = ErrorEnvelope::from(&self.0);
        (status, Json(envelope)).into_response()
    }
}

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        Self(e)
    }
}

impl From<FetchError> for AppError {
    fn from(e: FetchError) -> Self {
        Self(ApiError::Internal(e.to_string()))
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        Self(ApiError::Internal(e.to_string()))
    }
}

impl From<NormalizeError> for AppError {
    fn from(e: NormalizeError) -> Self {
        match e {
            NormalizeError::NotFound => Self(ApiError::NotFound("content not found".into())),
            NormalizeError::Fetch(e) => e.into(),
        }
    }
}

impl From<SearchError> for AppError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::EmptyQuery => Self(ApiError::BadRequest(e.to_string())),
            SearchError::UnknownProvider(_) => Self(ApiError::NotFound(e.to_string())),
            SearchError::Fetch(e) => e.into(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        Self(ApiError::BadRequest(e.body_text()))
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        Self(ApiError::BadRequest(e.body_text()))
    }
}
