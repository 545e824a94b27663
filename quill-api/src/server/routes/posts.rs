use crate::server::{
    Result, ServerError, ServerRouter,
    json::Json,
    loaded_post::LoadedPost,
    negotiate::{AcceptedFormats, Format},
    params::PermittedPostParams,
    views::{
        CreateScript, DestroyScript, EditTemplate, IndexTemplate, NewTemplate, Page, Script,
        ShowTemplate, UpdateScript,
    },
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::routing::{RouterExt, TypedPath};
use quill_common::model::{
    Id,
    post::{PostFields, PostMarker},
    validation::ValidationErrors,
};
use quill_db::{PostStore, SaveOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

pub const CREATED_NOTICE: &str = "Post created!";
pub const UPDATED_NOTICE: &str = "Post updated!";
pub const DESTROYED_NOTICE: &str = "Post destroyed!";

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(index)
        .typed_post(create_post)
        .typed_get(new_post)
        .typed_get(show_post)
        .typed_patch(update_post)
        .typed_put(update_post)
        .typed_delete(destroy_post)
        .typed_get(edit_post)
}

#[derive(TypedPath)]
#[typed_path("/posts")]
struct PostsPath;

#[derive(TypedPath)]
#[typed_path("/posts/new")]
struct NewPostPath;

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/edit", rejection(ServerError))]
struct EditPostPath {
    id: Id<PostMarker>,
}

#[derive(Serialize)]
struct ErrorsBody {
    errors: ValidationErrors,
}

/// Answers a save the store refused with 422 and the collection's errors.
///
/// The payload carries the errors of the post collection, not those of the
/// rejected post. Nothing loads the collection on a save, so the reported set
/// is always empty and the post's own errors only reach the log.
fn rejected_save(accepted: &AcceptedFormats, post_errors: &ValidationErrors) -> Result<Response> {
    accepted.negotiate(&[Format::Json])?;
    warn!(errors = %post_errors, "Post was not saved");

    // TODO: errors are read from the collection, not the rejected post.
    let collection_errors = ValidationErrors::new();

    Ok((
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorsBody {
            errors: collection_errors,
        }),
    )
        .into_response())
}

async fn index(
    PostsPath: PostsPath,
    accepted: AcceptedFormats,
    State(store): State<Arc<dyn PostStore>>,
) -> Result<Page<IndexTemplate>> {
    accepted.negotiate(&[Format::Html])?;

    let posts = store.fetch_posts_newest_first().await?;

    Ok(Page(IndexTemplate { posts }))
}

async fn show_post(
    PostPath { .. }: PostPath,
    accepted: AcceptedFormats,
    LoadedPost(post): LoadedPost,
) -> Result<Page<ShowTemplate>> {
    accepted.negotiate(&[Format::Html])?;

    Ok(Page(ShowTemplate { post }))
}

async fn new_post(
    NewPostPath: NewPostPath,
    accepted: AcceptedFormats,
) -> Result<Page<NewTemplate>> {
    accepted.negotiate(&[Format::Html])?;

    Ok(Page(NewTemplate::new(PostFields::default())))
}

async fn edit_post(
    EditPostPath { .. }: EditPostPath,
    accepted: AcceptedFormats,
    LoadedPost(post): LoadedPost,
) -> Result<Page<EditTemplate>> {
    accepted.negotiate(&[Format::Html])?;

    Ok(Page(EditTemplate::new(post)))
}

async fn create_post(
    PostsPath: PostsPath,
    accepted: AcceptedFormats,
    State(store): State<Arc<dyn PostStore>>,
    PermittedPostParams(params): PermittedPostParams,
) -> Result<Response> {
    match store.create_post(params).await? {
        SaveOutcome::Saved(post) => {
            info!(post_id = %post.id, "Created post");
            accepted.negotiate(&[Format::Js])?;

            Ok(Script(CreateScript::new(CREATED_NOTICE, &post)?).into_response())
        }
        SaveOutcome::Rejected(errors) => rejected_save(&accepted, &errors),
    }
}

async fn update_post(
    PostPath { .. }: PostPath,
    accepted: AcceptedFormats,
    State(store): State<Arc<dyn PostStore>>,
    LoadedPost(post): LoadedPost,
    PermittedPostParams(params): PermittedPostParams,
) -> Result<Response> {
    match store.update_post(&post, params).await? {
        SaveOutcome::Saved(post) => {
            info!(post_id = %post.id, "Updated post");
            accepted.negotiate(&[Format::Js])?;

            Ok(Script(UpdateScript::new(UPDATED_NOTICE, &post)?).into_response())
        }
        SaveOutcome::Rejected(errors) => rejected_save(&accepted, &errors),
    }
}

async fn destroy_post(
    PostPath { .. }: PostPath,
    accepted: AcceptedFormats,
    State(store): State<Arc<dyn PostStore>>,
    LoadedPost(post): LoadedPost,
) -> Result<Script<DestroyScript>> {
    store.delete_post(post.id).await?;
    info!(post_id = %post.id, "Destroyed post");
    accepted.negotiate(&[Format::Js])?;

    Ok(Script(DestroyScript::new(DESTROYED_NOTICE, post.id)?))
}

#[cfg(test)]
mod tests {
    use crate::server::{
        ServerState,
        routes::posts::{CREATED_NOTICE, DESTROYED_NOTICE, UPDATED_NOTICE},
    };
    use axum::{
        Router,
        body::Body,
        http::{
            HeaderName, Method, Request, StatusCode,
            header::{ACCEPT, CONTENT_TYPE, LOCATION},
        },
    };
    use quill_common::model::{
        Id,
        post::{Post, PostParams},
    };
    use quill_db::{PostStore, SaveOutcome, memory::MemoryStore};
    use std::sync::Arc;
    use time::UtcDateTime;
    use tower::ServiceExt;

    const UJS_ACCEPT: &str = "text/javascript, application/javascript, \
        application/ecmascript, application/x-ecmascript, */*; q=0.01";
    const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
    const FORM: &str = "application/x-www-form-urlencoded";

    struct Reply {
        status: StatusCode,
        content_type: String,
        location: Option<String>,
        body: String,
    }

    fn app(store: &Arc<MemoryStore>) -> Router {
        crate::server::routes().with_state(ServerState {
            store: store.clone(),
        })
    }

    async fn send(store: &Arc<MemoryStore>, request: Request<Body>) -> Reply {
        let response = app(store).oneshot(request).await.unwrap();

        let status = response.status();
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .map(|value| value.to_str().unwrap().to_owned())
        };
        let content_type = header(CONTENT_TYPE).unwrap_or_default();
        let location = header(LOCATION);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        Reply {
            status,
            content_type,
            location,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri)
            .header(ACCEPT, BROWSER_ACCEPT)
            .body(Body::empty())
            .unwrap()
    }

    fn submit(method: Method, uri: &str, form: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(ACCEPT, UJS_ACCEPT)
            .header(CONTENT_TYPE, FORM)
            .body(Body::from(form.to_owned()))
            .unwrap()
    }

    fn delete(uri: &str) -> Request<Body> {
        Request::delete(uri)
            .header(ACCEPT, UJS_ACCEPT)
            .body(Body::empty())
            .unwrap()
    }

    async fn seed(store: &MemoryStore, title: &str, content: &str) -> Post {
        let params = PostParams {
            title: Some(title.to_owned()),
            content: Some(content.to_owned()),
        };

        match store.create_post(params).await.unwrap() {
            SaveOutcome::Saved(post) => post,
            SaveOutcome::Rejected(errors) => panic!("seed post was rejected: {errors}"),
        }
    }

    #[tokio::test]
    async fn root_redirects_to_index() {
        let store = Arc::new(MemoryStore::new());

        let reply = send(&store, get("/")).await;

        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(reply.location.as_deref(), Some("/posts"));
    }

    #[tokio::test]
    async fn index_lists_newest_first() {
        let store = Arc::new(MemoryStore::new());
        let older = seed(&store, "Older post", "one").await;
        let newer = seed(&store, "Newer post", "two").await;

        let reply = send(&store, get("/posts")).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.content_type.starts_with("text/html"));
        let newer_at = reply.body.find(&format!("post_{}", newer.id)).unwrap();
        let older_at = reply.body.find(&format!("post_{}", older.id)).unwrap();
        assert!(newer_at < older_at);
    }

    #[tokio::test]
    async fn index_refuses_json_only_clients() {
        let store = Arc::new(MemoryStore::new());

        let request = Request::get("/posts")
            .header(ACCEPT, "application/json")
            .body(Body::empty())
            .unwrap();
        let reply = send(&store, request).await;

        assert_eq!(reply.status, StatusCode::NOT_ACCEPTABLE);
    }

    #[tokio::test]
    async fn index_refuses_clients_that_refuse_html() {
        let store = Arc::new(MemoryStore::new());

        for accept in ["text/html;q=0", "*/*, text/html;q=0"] {
            let request = Request::get("/posts")
                .header(ACCEPT, accept)
                .body(Body::empty())
                .unwrap();
            let reply = send(&store, request).await;

            assert_eq!(reply.status, StatusCode::NOT_ACCEPTABLE, "{accept}");
        }
    }

    #[tokio::test]
    async fn show_renders_post() {
        let store = Arc::new(MemoryStore::new());
        let post = seed(&store, "Shown", "Visible content").await;

        let reply = send(&store, get(&format!("/posts/{}", post.id))).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.body.contains("Shown"));
        assert!(reply.body.contains("Visible content"));
    }

    #[tokio::test]
    async fn show_of_unknown_post_is_not_found() {
        let store = Arc::new(MemoryStore::new());

        let missing = send(&store, get("/posts/404")).await;
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert_eq!(missing.body, r#"{"status":404}"#);

        let malformed = send(&store, get("/posts/not-a-number")).await;
        assert_eq!(malformed.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn new_form_is_empty_and_persists_nothing() {
        let store = Arc::new(MemoryStore::new());

        let reply = send(&store, get("/posts/new")).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.body.contains(r#"action="/posts""#));
        assert!(reply.body.contains(r#"name="post[title]" value="""#));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn edit_form_shows_current_fields() {
        let store = Arc::new(MemoryStore::new());
        let post = seed(&store, "Editable", "Current body").await;

        let reply = send(&store, get(&format!("/posts/{}/edit", post.id))).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.body.contains(r#"value="Editable""#));
        assert!(reply.body.contains("Current body"));

        let missing = send(&store, get("/posts/404/edit")).await;
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_persists_post_and_answers_with_script() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "Existing", "already here").await;
        let before = UtcDateTime::now();

        let reply = send(
            &store,
            submit(Method::POST, "/posts", "post[title]=Hello&post[content]=World"),
        )
        .await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.content_type, "text/javascript; charset=utf-8");
        assert!(reply.body.contains(CREATED_NOTICE));
        assert!(!reply.body.contains("<html"));

        let posts = store.fetch_posts_newest_first().await.unwrap();
        assert_eq!(posts.len(), 2);
        let created = &posts[0];
        assert_eq!(created.title(), "Hello");
        assert_eq!(created.content(), "World");
        assert!(created.created_at >= before);
        assert_ne!(created.id, posts[1].id);

        let index = send(&store, get("/posts")).await;
        let first_article = index.body.find("<article").unwrap();
        assert_eq!(
            index.body[first_article..].find(&format!("post_{}", created.id)),
            Some(r#"<article id=""#.len())
        );
    }

    #[tokio::test]
    async fn create_accepts_json_bodies() {
        let store = Arc::new(MemoryStore::new());

        let request = Request::post("/posts")
            .header(ACCEPT, UJS_ACCEPT)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"post": {"title": "From JSON", "content": "Body"}}"#,
            ))
            .unwrap();
        let reply = send(&store, request).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.body.contains(CREATED_NOTICE));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn create_drops_fields_outside_the_allow_list() {
        let store = Arc::new(MemoryStore::new());

        let reply = send(
            &store,
            submit(
                Method::POST,
                "/posts",
                "post[title]=Allowed&post[content]=Text&post[author]=mallory&post[id]=99&admin=1",
            ),
        )
        .await;

        assert_eq!(reply.status, StatusCode::OK);
        let posts = store.fetch_posts_newest_first().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title(), "Allowed");
        assert_eq!(posts[0].content(), "Text");
        assert_ne!(posts[0].id, Id::new(99));
    }

    #[tokio::test]
    async fn create_with_blank_title_is_unprocessable() {
        let store = Arc::new(MemoryStore::new());

        let reply = send(
            &store,
            submit(Method::POST, "/posts", "post[title]=&post[content]=x"),
        )
        .await;

        assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(reply.content_type.starts_with("application/json"));
        // Errors come from the (empty) post collection, not the rejected post.
        assert_eq!(reply.body, r#"{"errors":{}}"#);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn create_requires_post_parameter() {
        let store = Arc::new(MemoryStore::new());

        let reply = send(&store, submit(Method::POST, "/posts", "title=Hello")).await;

        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn create_rejects_unknown_body_types() {
        let store = Arc::new(MemoryStore::new());

        let request = Request::post("/posts")
            .header(ACCEPT, UJS_ACCEPT)
            .header(CONTENT_TYPE, "text/plain")
            .body(Body::from("Hello"))
            .unwrap();
        let reply = send(&store, request).await;

        assert_eq!(reply.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn create_success_only_answers_script_clients() {
        let store = Arc::new(MemoryStore::new());

        let request = Request::post("/posts")
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, FORM)
            .body(Body::from("post[title]=Saved&post[content]=anyway"))
            .unwrap();
        let reply = send(&store, request).await;

        assert_eq!(reply.status, StatusCode::NOT_ACCEPTABLE);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn update_changes_only_the_target_post() {
        let store = Arc::new(MemoryStore::new());
        let target = seed(&store, "Before", "Same content").await;
        let bystander = seed(&store, "Bystander", "Untouched").await;

        let reply = send(
            &store,
            submit(
                Method::PATCH,
                &format!("/posts/{}", target.id),
                "post[title]=After&post[author]=mallory",
            ),
        )
        .await;

        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.content_type.starts_with("text/javascript"));
        assert!(reply.body.contains(UPDATED_NOTICE));

        let updated = store.fetch_post(target.id).await.unwrap().unwrap();
        assert_eq!(updated.title(), "After");
        assert_eq!(updated.content(), "Same content");
        assert_eq!(updated.created_at, target.created_at);
        assert_eq!(
            store.fetch_post(bystander.id).await.unwrap(),
            Some(bystander)
        );
    }

    #[tokio::test]
    async fn update_accepts_put() {
        let store = Arc::new(MemoryStore::new());
        let post = seed(&store, "Title", "Content").await;

        let reply = send(
            &store,
            submit(
                Method::PUT,
                &format!("/posts/{}", post.id),
                "post[title]=Put&post[content]=Replaced",
            ),
        )
        .await;

        assert_eq!(reply.status, StatusCode::OK);
        let updated = store.fetch_post(post.id).await.unwrap().unwrap();
        assert_eq!(updated.title(), "Put");
        assert_eq!(updated.content(), "Replaced");
    }

    #[tokio::test]
    async fn invalid_update_is_unprocessable_and_keeps_post() {
        let store = Arc::new(MemoryStore::new());
        let post = seed(&store, "Keep me", "Content").await;

        let reply = send(
            &store,
            submit(
                Method::PATCH,
                &format!("/posts/{}", post.id),
                "post[title]=%20%20",
            ),
        )
        .await;

        assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(reply.body, r#"{"errors":{}}"#);
        assert_eq!(store.fetch_post(post.id).await.unwrap(), Some(post));
    }

    #[tokio::test]
    async fn update_of_unknown_post_is_not_found() {
        let store = Arc::new(MemoryStore::new());

        let reply = send(
            &store,
            submit(Method::PATCH, "/posts/404", "post[title]=Ghost"),
        )
        .await;

        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn destroy_removes_post() {
        let store = Arc::new(MemoryStore::new());
        let doomed = seed(&store, "Doomed", "Bye").await;
        let survivor = seed(&store, "Survivor", "Hi").await;

        let reply = send(&store, delete(&format!("/posts/{}", doomed.id))).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.content_type.starts_with("text/javascript"));
        assert!(reply.body.contains(DESTROYED_NOTICE));
        assert!(!reply.body.contains("Doomed"));

        assert_eq!(
            store.fetch_posts_newest_first().await.unwrap(),
            [survivor]
        );
        let index = send(&store, get("/posts")).await;
        assert!(!index.body.contains(&format!("post_{}", doomed.id)));

        let gone = send(&store, get(&format!("/posts/{}", doomed.id))).await;
        assert_eq!(gone.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn destroy_of_unknown_post_is_not_found() {
        let store = Arc::new(MemoryStore::new());

        let reply = send(&store, delete("/posts/404")).await;

        assert_eq!(reply.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let store = Arc::new(MemoryStore::new());

        let reply = send(&store, get("/comments")).await;

        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert_eq!(reply.body, r#"{"status":404}"#);
    }
}
