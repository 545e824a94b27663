use async_trait::async_trait;
use quill_common::model::{
    Id,
    post::{Post, PostFields, PostMarker, PostParams},
    validation::ValidationErrors,
};
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("Running migrations failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("Post with id {0} no longer exists")]
    PostNotFound(Id<PostMarker>),
}

/// Result of asking the store to save a post.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum SaveOutcome {
    Saved(Post),
    Rejected(ValidationErrors),
}

/// Persistent collection of posts.
///
/// Implementors provide raw reads and writes. Saving goes through the
/// provided [`PostStore::create_post`] and [`PostStore::update_post`], which
/// validate before anything is written.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>>;

    /// Every post, most recently created first.
    async fn fetch_posts_newest_first(&self) -> Result<Vec<Post>>;

    /// Inserts already validated fields, assigning the id and `created_at`.
    async fn insert_post(&self, fields: &PostFields) -> Result<Post>;

    /// Replaces the fields of an existing post with already validated ones.
    async fn write_post(&self, post_id: Id<PostMarker>, fields: &PostFields) -> Result<Post>;

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<()>;

    async fn create_post(&self, params: PostParams) -> Result<SaveOutcome> {
        let fields = PostFields::from(params);
        if let Err(errors) = fields.validate() {
            return Ok(SaveOutcome::Rejected(errors));
        }

        Ok(SaveOutcome::Saved(self.insert_post(&fields).await?))
    }

    async fn update_post(&self, post: &Post, params: PostParams) -> Result<SaveOutcome> {
        let fields = post.fields.clone().merge(params);
        if let Err(errors) = fields.validate() {
            return Ok(SaveOutcome::Rejected(errors));
        }

        Ok(SaveOutcome::Saved(self.write_post(post.id, &fields).await?))
    }
}
