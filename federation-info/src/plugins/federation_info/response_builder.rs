//! JSON responses of the federation info endpoint.

use axum::body::Body;
use http::Response;
use http::StatusCode;
use http::header;
use serde::Serialize;

use crate::error::FederationInfoError;

/// Body of every non-200 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(super) struct ErrorBody {
    pub(super) code: u16,
    pub(super) message: String,
}

pub(super) struct ResponseBuilder;

impl ResponseBuilder {
    pub(super) fn json_response<T: Serialize>(
        status: StatusCode,
        data: &T,
    ) -> Result<Response<Body>, FederationInfoError> {
        let body = serde_json::to_vec(data)?;

        Ok(Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CACHE_CONTROL, "no-cache")
            .body(Body::from(body))?)
    }

    /// `{code, message}` response for `status`.
    pub(super) fn error_response(status: StatusCode, message: impl Into<String>) -> Response<Body> {
        let body = ErrorBody {
            code: status.as_u16(),
            message: message.into(),
        };
        Self::json_response(status, &body).unwrap_or_else(|err| Self::plain_response(status, err))
    }

    /// Last resort when a JSON body cannot be built.
    pub(super) fn plain_response(status: StatusCode, err: FederationInfoError) -> Response<Body> {
        tracing::error!(%err, "could not build federation info response");
        let mut response = Response::new(Body::from(status.canonical_reason().unwrap_or_default()));
        *response.status_mut() = status;
        response
    }
}
