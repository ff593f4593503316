use crate::utils::error::GttError;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{async_trait, Json};
use serde_json::json;

/// `GttError` rendered as `{"success": false, "error": ...}` with a matching status code.
#[derive(Debug)]
pub struct ApiError(pub GttError);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<GttError> for ApiError {
    fn from(err: GttError) -> Self {
        Self(err)
    }
}

pub fn status_for(err: &GttError) -> StatusCode {
    match err {
        GttError::ValidationError { .. } | GttError::CsvError(_) => StatusCode::BAD_REQUEST,
        GttError::NotFound { .. } => StatusCode::NOT_FOUND,
        GttError::Conflict { .. } => StatusCode::CONFLICT,
        GttError::BrokerUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        GttError::KiteError { .. } if err.is_token_error() => StatusCode::UNAUTHORIZED,
        GttError::KiteError { .. } | GttError::ApiError(_) if err.is_network_error() => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        GttError::KiteError { .. } | GttError::ApiError(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!("❌ {} ({:?})", self.0, self.0.category());
        } else {
            tracing::warn!("⚠️ {}", self.0);
        }
        let body = json!({
            "success": false,
            "error": self.0.user_friendly_message(),
        });
        (status, Json(body)).into_response()
    }
}

/// JSON body extractor whose rejections use the API error envelope.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError(GttError::validation(rejection.body_text()))),
        }
    }
}

/// Query-string extractor with the same error envelope as `ApiJson`.
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError(GttError::validation(rejection.body_text()))),
        }
    }
}

pub struct ApiPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError(GttError::validation(rejection.body_text()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kite(status: u16, error_type: &str) -> GttError {
        GttError::KiteError {
            status,
            error_type: Some(error_type.to_string()),
            message: "boom".to_string(),
        }
    }

    #[test]
    fn maps_errors_to_status_codes() {
        assert_eq!(status_for(&GttError::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&GttError::not_found("x")), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&GttError::conflict("x")), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&GttError::BrokerUnavailable),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(status_for(&kite(403, "TokenException")), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_for(&kite(503, "NetworkException")),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(status_for(&kite(400, "InputException")), StatusCode::BAD_GATEWAY);
    }
}
