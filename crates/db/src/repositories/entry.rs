//! Diary entry repository for database operations.
//!
//! Implements entry CRUD using SeaORM. Ownership is part of every query
//! filter, so a foreign entry behaves exactly like a missing one.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, NotSet,
    PaginatorTrait, QueryFilter, QueryOrder, Set, sea_query::Expr,
};
use tracing::debug;

use crate::entities::diary_entries;
use diary_core::entry::{DiaryEntry, EntryChanges, EntryError, EntryRepository, NewEntry};
use diary_shared::types::{EntryId, UserId};

/// Diary entry repository implementation.
#[derive(Debug, Clone)]
pub struct SeaEntryRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaEntryRepository {
    /// Create a new entry repository over a shared connection pool.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl EntryRepository for SeaEntryRepository {
    async fn list(
        &self,
        user: &UserId,
        category: Option<&str>,
    ) -> Result<Vec<DiaryEntry>, EntryError> {
        let mut query = diary_entries::Entity::find()
            .filter(diary_entries::Column::UserId.eq(user.as_str()));
        if let Some(category) = category {
            query = query.filter(diary_entries::Column::Category.eq(category));
        }

        let models = query
            .order_by_desc(diary_entries::Column::CreatedAt)
            .order_by_desc(diary_entries::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(repository_error)?;

        debug!(user_id = %user, count = models.len(), "Listed diary entries");
        Ok(models.into_iter().map(to_domain).collect())
    }

    async fn find(&self, id: EntryId, user: &UserId) -> Result<Option<DiaryEntry>, EntryError> {
        let model = diary_entries::Entity::find_by_id(id.into_inner())
            .filter(diary_entries::Column::UserId.eq(user.as_str()))
            .one(self.db.as_ref())
            .await
            .map_err(repository_error)?;

        Ok(model.map(to_domain))
    }

    async fn insert(&self, entry: NewEntry) -> Result<DiaryEntry, EntryError> {
        let active_model = diary_entries::ActiveModel {
            id: NotSet,
            title: Set(entry.title),
            content: Set(entry.content),
            category: Set(entry.category),
            created_at: Set(entry.created_at.into()),
            user_id: Set(Some(entry.user_id.into_inner())),
            image_url: Set(entry.image_url),
        };

        let model = active_model
            .insert(self.db.as_ref())
            .await
            .map_err(repository_error)?;

        Ok(to_domain(model))
    }

    async fn update(
        &self,
        id: EntryId,
        user: &UserId,
        changes: EntryChanges,
    ) -> Result<Option<DiaryEntry>, EntryError> {
        // Owner and creation time stay NotSet, so they never appear in the UPDATE.
        let active_model = diary_entries::ActiveModel {
            title: Set(changes.title),
            content: Set(changes.content),
            category: Set(changes.category),
            image_url: Set(changes.image_url),
            ..Default::default()
        };

        let mut updated = diary_entries::Entity::update_many()
            .set(active_model)
            .filter(diary_entries::Column::Id.eq(id.into_inner()))
            .filter(diary_entries::Column::UserId.eq(user.as_str()))
            .exec_with_returning(self.db.as_ref())
            .await
            .map_err(repository_error)?;

        Ok(updated.pop().map(to_domain))
    }

    async fn set_image(
        &self,
        id: EntryId,
        user: &UserId,
        image_url: Option<String>,
    ) -> Result<bool, EntryError> {
        let result = diary_entries::Entity::update_many()
            .col_expr(diary_entries::Column::ImageUrl, Expr::value(image_url))
            .filter(diary_entries::Column::Id.eq(id.into_inner()))
            .filter(diary_entries::Column::UserId.eq(user.as_str()))
            .exec(self.db.as_ref())
            .await
            .map_err(repository_error)?;

        Ok(result.rows_affected > 0)
    }

    async fn delete(&self, id: EntryId, user: &UserId) -> Result<bool, EntryError> {
        let result = diary_entries::Entity::delete_many()
            .filter(diary_entries::Column::Id.eq(id.into_inner()))
            .filter(diary_entries::Column::UserId.eq(user.as_str()))
            .exec(self.db.as_ref())
            .await
            .map_err(repository_error)?;

        Ok(result.rows_affected > 0)
    }

    async fn image_in_use(&self, image_url: &str) -> Result<bool, EntryError> {
        let count: u64 = diary_entries::Entity::find()
            .filter(diary_entries::Column::ImageUrl.eq(image_url))
            .count(self.db.as_ref())
            .await
            .map_err(repository_error)?;

        Ok(count > 0)
    }

    async fn exists(&self, id: EntryId) -> Result<bool, EntryError> {
        let count: u64 = diary_entries::Entity::find_by_id(id.into_inner())
            .count(self.db.as_ref())
            .await
            .map_err(repository_error)?;

        Ok(count > 0)
    }
}

fn repository_error(err: DbErr) -> EntryError {
    EntryError::repository(err.to_string())
}

/// Convert database model to domain entry.
fn to_domain(model: diary_entries::Model) -> DiaryEntry {
    DiaryEntry {
        id: EntryId(model.id),
        title: model.title,
        content: model.content,
        category: model.category,
        created_at: model.created_at.with_timezone(&Utc),
        image_url: model.image_url.filter(|url| !url.is_empty()),
        user_id: model.user_id.map(UserId::new),
    }
}
