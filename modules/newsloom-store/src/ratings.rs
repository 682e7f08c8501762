use sqlx::types::Json;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{NewRating, Rating};
use crate::Store;

impl Store {
    pub async fn insert_rating(&self, rating: NewRating) -> Result<Rating> {
        let row = sqlx::query_as::<_, Rating>(
            r#"
            INSERT INTO ratings (source_item_id, cycle_id, criteria, total_score)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(rating.source_item_id)
        .bind(rating.cycle_id)
        .bind(Json(&rating.criteria))
        .bind(rating.total_score)
        .fetch_one(self.pool())
        .await?;

        Ok(row)
    }

    pub async fn ratings_for_cycle(&self, cycle_id: Uuid) -> Result<Vec<Rating>> {
        let rows = sqlx::query_as::<_, Rating>(
            r#"
            SELECT * FROM ratings
            WHERE cycle_id = $1
            "#,
        )
        .bind(cycle_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }
}
