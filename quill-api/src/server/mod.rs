use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{FormRejection, JsonRejection, PathRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use json::Json;
use quill_common::model::{Id, post::PostMarker};
use quill_db::{DbError, PostStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

mod json;
mod loaded_post;
mod negotiate;
mod params;
mod routes;
mod views;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub store: Arc<dyn PostStore>,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("Incoming form rejected: {0}")]
    FormRejection(#[from] FormRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Required parameter is missing or empty: {0}")]
    ParameterMissing(&'static str),
    #[error("Parameter 'post' is invalid: {0}")]
    InvalidPostParameter(String),
    #[error("Request body has an unsupported content type")]
    UnsupportedMediaType,
    #[error("None of the accepted formats can be produced")]
    NotAcceptable,
    #[error("Template could not be rendered: {0}")]
    Render(#[from] askama::Error),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::Database(DbError::PostNotFound(_)) => StatusCode::NOT_FOUND,
            ServerError::JsonRejection(_)
            | ServerError::FormRejection(_)
            | ServerError::ParameterMissing(_)
            | ServerError::InvalidPostParameter(_) => StatusCode::BAD_REQUEST,
            ServerError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ServerError::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            ServerError::JsonResponse(_) | ServerError::Render(_) | ServerError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
        };
        (status, Json(error_response)).into_response()
    }
}
