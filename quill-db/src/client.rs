use crate::{
    record::PostRecord,
    store::{DbError, PostStore, Result},
};
use async_trait::async_trait;
use quill_common::model::{
    Id,
    post::{Post, PostFields, PostMarker},
};
use sqlx::{PgPool, postgres::PgPoolOptions, query, query_as};
use tracing::info;

/// Postgres-backed post store.
#[derive(Clone, Debug)]
pub struct DbClient {
    pool: PgPool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations are up to date");
        Ok(())
    }
}

#[async_trait]
impl PostStore for DbClient {
    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(
            "
            SELECT
                posts.post_id,
                posts.title,
                posts.content,
                posts.created_at
            FROM
                posts.posts
            WHERE
                posts.post_id = $1
            ",
        )
        .bind(post_id.get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Post::from))
    }

    async fn fetch_posts_newest_first(&self) -> Result<Vec<Post>> {
        let records = query_as::<_, PostRecord>(
            "
            SELECT
                posts.post_id,
                posts.title,
                posts.content,
                posts.created_at
            FROM
                posts.posts
            ORDER BY
                posts.created_at DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Post::from).collect())
    }

    async fn insert_post(&self, fields: &PostFields) -> Result<Post> {
        let record = query_as::<_, PostRecord>(
            "
            INSERT INTO posts.posts (title, content)
            VALUES ($1, $2)
            RETURNING post_id, title, content, created_at
            ",
        )
        .bind(&fields.title)
        .bind(&fields.content)
        .fetch_one(&self.pool)
        .await?;

        Ok(record.into())
    }

    async fn write_post(&self, post_id: Id<PostMarker>, fields: &PostFields) -> Result<Post> {
        let record = query_as::<_, PostRecord>(
            "
            UPDATE posts.posts
            SET title = $2, content = $3
            WHERE post_id = $1
            RETURNING post_id, title, content, created_at
            ",
        )
        .bind(post_id.get().cast_signed())
        .bind(&fields.title)
        .bind(&fields.content)
        .fetch_optional(&self.pool)
        .await?;

        record
            .map(Post::from)
            .ok_or(DbError::PostNotFound(post_id))
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<()> {
        query("DELETE FROM posts.posts WHERE post_id = $1")
            .bind(post_id.get().cast_signed())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
