use crate::server::{Result, ServerError, json::Json};
use axum::{
    Form,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
};
use mime::Mime;
use quill_common::model::post::PostParams;
use serde::Deserialize;
use serde_json::Value;

#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct PermittedPostParams(pub PostParams);

#[derive(Deserialize)]
struct JsonEnvelope {
    post: Option<Value>,
}

fn permit_form(pairs: Vec<(String, String)>) -> Result<PostParams> {
    let mut post_present = false;
    let mut params = PostParams::default();

    for (key, value) in pairs {
        let Some(attribute) = key
            .strip_prefix("post[")
            .and_then(|rest| rest.strip_suffix(']'))
        else {
            continue;
        };
        post_present = true;

        match attribute {
            "title" => params.title = Some(value),
            "content" => params.content = Some(value),
            _ => {}
        }
    }

    if post_present {
        Ok(params)
    } else {
        Err(ServerError::ParameterMissing("post"))
    }
}

fn permit_json(envelope: JsonEnvelope) -> Result<PostParams> {
    match envelope.post {
        None | Some(Value::Null) => Err(ServerError::ParameterMissing("post")),
        Some(Value::Object(object)) if object.is_empty() => {
            Err(ServerError::ParameterMissing("post"))
        }
        Some(post @ Value::Object(_)) => serde_json::from_value(post)
            .map_err(|err| ServerError::InvalidPostParameter(err.to_string())),
        Some(_) => Err(ServerError::InvalidPostParameter(
            "expected an object".to_owned(),
        )),
    }
}

fn body_mime(request: &Request) -> Option<Mime> {
    request
        .headers()
        .get(CONTENT_TYPE)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

impl<S> FromRequest<S> for PermittedPostParams
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Some(body_mime) = body_mime(&request) else {
            return Err(ServerError::UnsupportedMediaType);
        };

        let essence = body_mime.essence_str();
        let params = if essence == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str() {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, state).await?;
            permit_form(pairs)?
        } else if essence == mime::APPLICATION_JSON.essence_str()
            || body_mime.suffix() == Some(mime::JSON)
        {
            let Json(envelope) = Json::<JsonEnvelope>::from_request(request, state).await?;
            permit_json(envelope)?
        } else {
            return Err(ServerError::UnsupportedMediaType);
        };

        Ok(Self(params))
    }
}
