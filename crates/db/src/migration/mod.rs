//! Database migrations.
//!
//! Migrations are managed using sea-orm-migration and replay the history
//! of the entries table: a free-text `tag` that became `category`, a
//! nullable `date` replaced by a required `created_at`, and the later
//! nullable `user_id` and `image_url` columns.

pub use sea_orm_migration::prelude::*;

mod m20250601_000001_create_diary_entries;
mod m20250614_000002_update_diary_entry_model;
mod m20250702_000003_add_user_id;
mod m20250719_000004_add_image_url;

/// Migrator for running database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_diary_entries::Migration),
            Box::new(m20250614_000002_update_diary_entry_model::Migration),
            Box::new(m20250702_000003_add_user_id::Migration),
            Box::new(m20250719_000004_add_image_url::Migration),
        ]
    }
}
