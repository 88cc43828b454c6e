use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use survarium_api::ApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("no method {0} available")]
    UnknownMethod(String),
    #[error("{source}")]
    Api {
        #[source]
        source: ApiError,
        /// Include the error chain in the response body.
        detailed: bool,
    },
    #[error("{0}")]
    BadRequest(String),
}

impl ServerError {
    pub fn api(source: ApiError, detailed: bool) -> Self {
        match source {
            ApiError::UnknownMethod(name) => Self::UnknownMethod(name),
            source => Self::Api { source, detailed },
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack: Option<String>,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, stack) = match &self {
            ServerError::UnknownMethod(_) => {
                return (StatusCode::UNAUTHORIZED, self.to_string()).into_response();
            }
            ServerError::Api { source, detailed } => {
                let status = match source {
                    ApiError::Http { status: None, .. } => StatusCode::SERVICE_UNAVAILABLE,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                tracing::error!("request failed: {:?}", source);
                (status, detailed.then(|| format!("{:?}", source)))
            }
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, None),
        };

        let body = Json(ErrorBody {
            message: self.to_string(),
            status: status.as_u16(),
            stack,
        });
        (status, body).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
