//! Custom extractors with error responses in the API's envelope

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, StatusCode},
};
use serde::de::DeserializeOwned;

use crate::types::error::AppError;

/// JSON body extractor
///
/// The body is parsed as JSON whatever its `Content-Type` header says.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|_| AppError::invalid_json())?;

        let payload = serde_json::from_slice(&bytes).map_err(|err| {
            tracing::debug!("Rejected request body: {err}");
            AppError::invalid_json()
        })?;

        Ok(Self(payload))
    }
}

/// Query string extractor
pub struct QueryParams<T>(pub T);

impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|err| {
                tracing::debug!("Rejected query string: {err}");
                AppError::new(
                    StatusCode::BAD_REQUEST,
                    "invalid_query",
                    "Invalid query string",
                )
            })?;

        Ok(Self(params))
    }
}
