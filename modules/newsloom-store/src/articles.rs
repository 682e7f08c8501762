use uuid::Uuid;

use crate::error::Result;
use crate::models::{Article, NewArticle};
use crate::Store;

impl Store {
    /// Articles are stored inactive regardless of fact-check outcome so
    /// failed generations stay auditable; activation happens in selection.
    pub async fn insert_article(&self, article: NewArticle) -> Result<Article> {
        let row = sqlx::query_as::<_, Article>(
            r#"
            INSERT INTO articles
                (source_item_id, cycle_id, headline, body,
                 fact_check_score, fact_check_details, word_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(article.source_item_id)
        .bind(article.cycle_id)
        .bind(&article.headline)
        .bind(&article.body)
        .bind(article.fact_check_score)
        .bind(&article.fact_check_details)
        .bind(article.word_count)
        .fetch_one(self.pool())
        .await?;

        Ok(row)
    }

    pub async fn articles_for_cycle(&self, cycle_id: Uuid) -> Result<Vec<Article>> {
        let rows = sqlx::query_as::<_, Article>(
            r#"
            SELECT * FROM articles
            WHERE cycle_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(cycle_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    pub async fn activate_article(&self, article_id: Uuid, rank: i32) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE articles SET active = TRUE, rank = $2
            WHERE id = $1
            "#,
        )
        .bind(article_id)
        .bind(rank)
        .execute(self.pool())
        .await?;

        Ok(())
    }
}
