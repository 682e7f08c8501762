use uuid::Uuid;

use crate::error::Result;
use crate::models::Feed;
use crate::Store;

impl Store {
    pub async fn active_feeds(&self) -> Result<Vec<Feed>> {
        let feeds = sqlx::query_as::<_, Feed>(
            r#"
            SELECT * FROM feeds
            WHERE active = TRUE
            ORDER BY name ASC
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        Ok(feeds)
    }

    /// A successful pass stamps `last_processed_at` and resets the
    /// error counter.
    pub async fn mark_feed_success(&self, feed_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE feeds
            SET last_processed_at = now(), error_count = 0
            WHERE id = $1
            "#,
        )
        .bind(feed_id)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub async fn mark_feed_failure(&self, feed_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE feeds
            SET error_count = error_count + 1
            WHERE id = $1
            "#,
        )
        .bind(feed_id)
        .execute(self.pool())
        .await?;

        Ok(())
    }
}
