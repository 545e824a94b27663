use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts, Path},
    http::request::Parts,
};
use quill_common::model::{
    Id,
    post::{Post, PostMarker},
};
use quill_db::PostStore;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
struct PostIdParams {
    id: Id<PostMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct LoadedPost(pub Post);

impl<S> FromRequestParts<S> for LoadedPost
where
    Arc<dyn PostStore>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(PostIdParams { id }) = Path::from_request_parts(parts, state).await?;

        let post = Arc::<dyn PostStore>::from_ref(state)
            .fetch_post(id)
            .await?
            .ok_or(ServerError::PostByIdNotFound(id))?;

        Ok(Self(post))
    }
}
