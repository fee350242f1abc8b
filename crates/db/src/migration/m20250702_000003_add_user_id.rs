//! Adds entry ownership.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(UP_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DOWN_SQL).await?;
        Ok(())
    }
}

// Existing rows predate ownership, so the column stays nullable.
const UP_SQL: &str = r"
ALTER TABLE diary_entries ADD COLUMN user_id TEXT;

-- Index for a user's entries, newest first (the list query)
CREATE INDEX idx_diary_entries_user_created ON diary_entries(user_id, created_at DESC);
";

const DOWN_SQL: &str = r"
DROP INDEX IF EXISTS idx_diary_entries_user_created;
ALTER TABLE diary_entries DROP COLUMN user_id;
";
