use uuid::Uuid;

use crate::error::Result;
use crate::models::{NewSourceItem, SourceItem};
use crate::Store;

impl Store {
    /// Ingestion-time dedup on the feed-scoped external id.
    pub async fn item_exists(&self, feed_id: Uuid, external_id: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM source_items
                WHERE feed_id = $1 AND external_id = $2
            )
            "#,
        )
        .bind(feed_id)
        .bind(external_id)
        .fetch_one(self.pool())
        .await?;

        Ok(exists)
    }

    pub async fn insert_item(&self, item: NewSourceItem) -> Result<SourceItem> {
        let row = sqlx::query_as::<_, SourceItem>(
            r#"
            INSERT INTO source_items
                (feed_id, external_id, title, description, author,
                 published_at, url, image_url, cycle_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(item.feed_id)
        .bind(&item.external_id)
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.author)
        .bind(item.published_at)
        .bind(&item.url)
        .bind(&item.image_url)
        .bind(item.cycle_id)
        .fetch_one(self.pool())
        .await?;

        Ok(row)
    }

    pub async fn items_for_cycle(&self, cycle_id: Uuid) -> Result<Vec<SourceItem>> {
        let rows = sqlx::query_as::<_, SourceItem>(
            r#"
            SELECT * FROM source_items
            WHERE cycle_id = $1
            ORDER BY published_at DESC
            "#,
        )
        .bind(cycle_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }
}
