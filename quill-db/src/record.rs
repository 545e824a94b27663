use quill_common::model::post::{Post, PostFields};
use sqlx::FromRow;
use time::PrimitiveDateTime;

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: PrimitiveDateTime,
}

impl From<PostRecord> for Post {
    fn from(value: PostRecord) -> Self {
        Self {
            id: value.post_id.cast_unsigned().into(),
            fields: PostFields {
                title: value.title,
                content: value.content,
            },
            created_at: value.created_at.as_utc(),
        }
    }
}
