use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;

use crate::application::repos::{
    CreatePostParams, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{CategorySummary, PostRecord, PostWithCategories};

use super::PostgresRepositories;
use super::util::map_sqlx_error;

const POST_COLUMNS: &str = "id, title, content, thumbnail_image_key, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    title: String,
    content: String,
    thumbnail_image_key: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            thumbnail_image_key: row.thumbnail_image_key,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostCategoryRow {
    post_id: i64,
    category_id: i64,
    name: String,
}

impl PostgresRepositories {
    async fn load_categories(
        &self,
        post_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<CategorySummary>>, RepoError> {
        let mut grouped: HashMap<i64, Vec<CategorySummary>> = HashMap::new();
        if post_ids.is_empty() {
            return Ok(grouped);
        }

        let rows = sqlx::query_as::<_, PostCategoryRow>(
            r#"
            SELECT pc.post_id, c.id AS category_id, c.name
            FROM post_categories pc
            INNER JOIN categories c ON c.id = pc.category_id
            WHERE pc.post_id = ANY($1)
            ORDER BY c.id
            "#,
        )
        .bind(post_ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        for row in rows {
            grouped.entry(row.post_id).or_default().push(CategorySummary {
                id: row.category_id,
                name: row.name,
            });
        }
        Ok(grouped)
    }
}

async fn link_categories(
    tx: &mut Transaction<'_, Postgres>,
    post_id: i64,
    category_ids: &[i64],
) -> Result<u64, RepoError> {
    if category_ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"
        INSERT INTO post_categories (post_id, category_id)
        SELECT $1, category_id
        FROM UNNEST($2::bigint[]) AS category_id
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(post_id)
    .bind(category_ids)
    .execute(&mut **tx)
    .await
    .map_err(map_sqlx_error)?;

    Ok(result.rows_affected())
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(&self) -> Result<Vec<PostWithCategories>, RepoError> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let mut categories = self.load_categories(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| PostWithCategories {
                categories: categories.remove(&row.id).unwrap_or_default(),
                post: PostRecord::from(row),
            })
            .collect())
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostWithCategories>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut categories = self.load_categories(&[row.id]).await?;
        Ok(Some(PostWithCategories {
            categories: categories.remove(&row.id).unwrap_or_default(),
            post: PostRecord::from(row),
        }))
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let CreatePostParams {
            title,
            content,
            thumbnail_image_key,
            category_ids,
        } = params;

        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, PostRow>(&format!(
            "INSERT INTO posts (title, content, thumbnail_image_key) \
             VALUES ($1, $2, $3) \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(title)
        .bind(content)
        .bind(thumbnail_image_key)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        link_categories(&mut tx, row.id, &category_ids).await?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let UpdatePostParams {
            id,
            title,
            content,
            thumbnail_image_key,
            category_ids,
        } = params;

        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        // `updated_at` only moves when a column actually changes so repeated PUTs are no-ops.
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "UPDATE posts \
             SET title = $2, \
                 content = $3, \
                 thumbnail_image_key = $4, \
                 updated_at = CASE \
                     WHEN (title, content, thumbnail_image_key) IS DISTINCT FROM ($2, $3, $4) \
                     THEN now() ELSE updated_at END \
             WHERE id = $1 \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(title)
        .bind(content)
        .bind(thumbnail_image_key)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        let unlinked = sqlx::query(
            r#"
            DELETE FROM post_categories
            WHERE post_id = $1 AND category_id <> ALL($2::bigint[])
            "#,
        )
        .bind(id)
        .bind(category_ids.as_slice())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

        let linked = link_categories(&mut tx, id, &category_ids).await?;

        let row = if unlinked + linked > 0 {
            sqlx::query_as::<_, PostRow>(&format!(
                "UPDATE posts SET updated_at = now() WHERE id = $1 RETURNING {POST_COLUMNS}"
            ))
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
        } else {
            row
        };

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
