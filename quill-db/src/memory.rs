use crate::store::{DbError, PostStore, Result};
use async_trait::async_trait;
use quill_common::model::{
    Id,
    post::{Post, PostFields, PostMarker},
};
use time::{Duration, UtcDateTime};
use tokio::sync::RwLock;
use tracing::debug;

/// Post store that lives in process memory.
///
/// Ids count up from 1 and `created_at` strictly increases with every
/// insert, even when the clock does not move between two of them.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    last_id: u64,
    last_created_at: Option<UtcDateTime>,
    posts: Vec<Post>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.posts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl MemoryState {
    fn next_created_at(&mut self) -> UtcDateTime {
        let now = UtcDateTime::now();
        let created_at = match self.last_created_at {
            Some(last) if now <= last => last + Duration::nanoseconds(1),
            _ => now,
        };
        self.last_created_at = Some(created_at);
        created_at
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let state = self.state.read().await;
        Ok(state.posts.iter().find(|post| post.id == post_id).cloned())
    }

    async fn fetch_posts_newest_first(&self) -> Result<Vec<Post>> {
        let mut posts = self.state.read().await.posts.clone();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn insert_post(&self, fields: &PostFields) -> Result<Post> {
        let mut state = self.state.write().await;

        state.last_id += 1;
        let post = Post {
            id: Id::new(state.last_id),
            fields: fields.clone(),
            created_at: state.next_created_at(),
        };
        state.posts.push(post.clone());

        debug!(post_id = %post.id, "Inserted post into memory store");
        Ok(post)
    }

    async fn write_post(&self, post_id: Id<PostMarker>, fields: &PostFields) -> Result<Post> {
        let mut state = self.state.write().await;

        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == post_id)
            .ok_or(DbError::PostNotFound(post_id))?;
        post.fields = fields.clone();

        Ok(post.clone())
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<()> {
        self.state
            .write()
            .await
            .posts
            .retain(|post| post.id != post_id);

        Ok(())
    }
}
