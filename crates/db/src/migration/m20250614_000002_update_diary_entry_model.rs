//! Replaces the optional `date` with a required `created_at` and renames
//! `tag` to `category`.

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

const UP_SQL: &str = r"
ALTER TABLE diary_entries DROP COLUMN date;
ALTER TABLE diary_entries RENAME COLUMN tag TO category;
ALTER TABLE diary_entries ADD COLUMN created_at TIMESTAMPTZ NOT NULL DEFAULT now();
";

const DOWN_SQL: &str = r"
ALTER TABLE diary_entries DROP COLUMN created_at;
ALTER TABLE diary_entries RENAME COLUMN category TO tag;
ALTER TABLE diary_entries ADD COLUMN date TIMESTAMPTZ;
";
