use crate::server::ServerRouter;
use axum::{response::Redirect, routing::get};

mod posts;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .route("/", get(|| async { Redirect::to("/posts") }))
        .merge(posts::routes())
}
