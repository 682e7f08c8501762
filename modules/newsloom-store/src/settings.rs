use std::collections::HashMap;

use serde_json::Value;

use crate::error::Result;
use crate::Store;

impl Store {
    /// All settings rows as a key/value map. Read once per cycle and
    /// folded into a `CycleConfig`, never re-fetched per item.
    pub async fn load_settings(&self) -> Result<HashMap<String, Value>> {
        let rows = sqlx::query_as::<_, (String, Value)>("SELECT key, value FROM settings")
            .fetch_all(self.pool())
            .await?;

        Ok(rows.into_iter().collect())
    }
}
