use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Cycle, CycleStatus};
use crate::Store;

impl Store {
    /// Idempotent lookup-or-create for the cycle of a given date.
    pub async fn find_or_create_cycle(&self, date: NaiveDate) -> Result<Cycle> {
        let cycle = sqlx::query_as::<_, Cycle>(
            r#"
            INSERT INTO cycles (date, status)
            VALUES ($1, 'processing')
            ON CONFLICT (date) DO UPDATE SET date = EXCLUDED.date
            RETURNING *
            "#,
        )
        .bind(date)
        .fetch_one(self.pool())
        .await?;

        Ok(cycle)
    }

    /// Most recent cycle dated strictly before `before`, if any.
    pub async fn previous_cycle(&self, before: NaiveDate) -> Result<Option<Cycle>> {
        let cycle = sqlx::query_as::<_, Cycle>(
            r#"
            SELECT * FROM cycles
            WHERE date < $1
            ORDER BY date DESC
            LIMIT 1
            "#,
        )
        .bind(before)
        .fetch_optional(self.pool())
        .await?;

        Ok(cycle)
    }

    pub async fn update_cycle_status(&self, cycle_id: Uuid, status: CycleStatus) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE cycles SET status = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(cycle_id)
        .bind(status.as_str())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub async fn set_subject_line(&self, cycle_id: Uuid, subject: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE cycles SET subject_line = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(cycle_id)
        .bind(subject)
        .execute(self.pool())
        .await?;

        Ok(())
    }
}
