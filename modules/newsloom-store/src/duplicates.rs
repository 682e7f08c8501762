use uuid::Uuid;

use crate::error::Result;
use crate::models::NewDuplicateGroup;
use crate::Store;

impl Store {
    /// Insert one duplicate group and its members. Group rows are
    /// created once per cycle and read-only afterward.
    pub async fn insert_duplicate_group(&self, group: NewDuplicateGroup) -> Result<Uuid> {
        let mut tx = self.pool().begin().await?;

        let group_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO duplicate_groups (cycle_id, primary_item_id, topic_signature)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(group.cycle_id)
        .bind(group.primary_item_id)
        .bind(&group.topic_signature)
        .fetch_one(&mut *tx)
        .await?;

        for member_id in &group.member_item_ids {
            sqlx::query(
                r#"
                INSERT INTO duplicate_members (group_id, source_item_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(group_id)
            .bind(member_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(group_id)
    }
}
