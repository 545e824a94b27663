use crate::server::{Result, ServerError};
use askama::Template;
use axum::{
    http::{HeaderValue, header::CONTENT_TYPE},
    response::{Html, IntoResponse, Response},
};
use quill_common::model::{
    Id,
    post::{Post, PostFields, PostMarker},
};

/// A template rendered as a full HTML page.
pub struct Page<T>(pub T);

/// A template rendered as a script fragment, without layout.
pub struct Script<T>(pub T);

impl<T: Template> IntoResponse for Page<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => ServerError::Render(err).into_response(),
        }
    }
}

impl<T: Template> IntoResponse for Script<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(script) => (
                [(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/javascript; charset=utf-8"),
                )],
                script,
            )
                .into_response(),
            Err(err) => ServerError::Render(err).into_response(),
        }
    }
}

/// Where a post form submits to and with which method.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct PostForm {
    pub action: String,
    pub method: &'static str,
    pub submit: &'static str,
    pub fields: PostFields,
}

#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexTemplate {
    pub posts: Vec<Post>,
}

#[derive(Template)]
#[template(path = "posts/show.html")]
pub struct ShowTemplate {
    pub post: Post,
}

#[derive(Template)]
#[template(path = "posts/new.html")]
pub struct NewTemplate {
    pub form: PostForm,
}

impl NewTemplate {
    #[must_use]
    pub fn new(fields: PostFields) -> Self {
        Self {
            form: PostForm {
                action: "/posts".to_owned(),
                method: "post",
                submit: "Create Post",
                fields,
            },
        }
    }
}

#[derive(Template)]
#[template(path = "posts/edit.html")]
pub struct EditTemplate {
    pub post_id: Id<PostMarker>,
    pub form: PostForm,
}

impl EditTemplate {
    #[must_use]
    pub fn new(post: Post) -> Self {
        Self {
            post_id: post.id,
            form: PostForm {
                action: format!("/posts/{}", post.id),
                method: "patch",
                submit: "Update Post",
                fields: post.fields,
            },
        }
    }
}

#[derive(Template)]
#[template(path = "posts/_post.html")]
struct PostPartial<'a> {
    post: &'a Post,
}

/// Encodes text as a JavaScript string literal.
fn js_string(value: &str) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

#[derive(Template)]
#[template(path = "posts/create.js", escape = "none")]
pub struct CreateScript {
    notice: String,
    post_html: String,
}

impl CreateScript {
    pub fn new(notice: &str, post: &Post) -> Result<Self> {
        Ok(Self {
            notice: js_string(notice)?,
            post_html: js_string(&PostPartial { post }.render()?)?,
        })
    }
}

#[derive(Template)]
#[template(path = "posts/update.js", escape = "none")]
pub struct UpdateScript {
    notice: String,
    element_id: String,
    post_html: String,
}

impl UpdateScript {
    pub fn new(notice: &str, post: &Post) -> Result<Self> {
        Ok(Self {
            notice: js_string(notice)?,
            element_id: js_string(&format!("post_{}", post.id))?,
            post_html: js_string(&PostPartial { post }.render()?)?,
        })
    }
}

#[derive(Template)]
#[template(path = "posts/destroy.js", escape = "none")]
pub struct DestroyScript {
    notice: String,
    element_id: String,
}

impl DestroyScript {
    pub fn new(notice: &str, post_id: Id<PostMarker>) -> Result<Self> {
        Ok(Self {
            notice: js_string(notice)?,
            element_id: js_string(&format!("post_{post_id}"))?,
        })
    }
}
