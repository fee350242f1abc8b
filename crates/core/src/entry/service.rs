//! Diary service implementation.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use diary_shared::types::{EntryId, UserId};
use tracing::{debug, info, warn};

use super::error::EntryError;
use super::types::{DiaryEntry, EntryChanges, EntryForm, NewEntry};
use crate::storage::{ObjectStorage, UPLOAD_PREFIX, new_object_path};

/// Content type assumed when an upload does not declare one.
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Repository trait for diary entry persistence.
///
/// This trait is implemented by the db crate. Every lookup that takes a
/// user filters on ownership in the query itself.
pub trait EntryRepository: Send + Sync {
    /// Entries owned by `user`, newest first, optionally limited to one category.
    fn list(
        &self,
        user: &UserId,
        category: Option<&str>,
    ) -> impl Future<Output = Result<Vec<DiaryEntry>, EntryError>> + Send;

    /// Finds an entry owned by `user`.
    fn find(
        &self,
        id: EntryId,
        user: &UserId,
    ) -> impl Future<Output = Result<Option<DiaryEntry>, EntryError>> + Send;

    /// Inserts a new entry.
    fn insert(&self, entry: NewEntry)
    -> impl Future<Output = Result<DiaryEntry, EntryError>> + Send;

    /// Applies an edit. Returns `None` when no owned row was updated.
    fn update(
        &self,
        id: EntryId,
        user: &UserId,
        changes: EntryChanges,
    ) -> impl Future<Output = Result<Option<DiaryEntry>, EntryError>> + Send;

    /// Sets or clears the image URL. Returns false when no owned row matched.
    fn set_image(
        &self,
        id: EntryId,
        user: &UserId,
        image_url: Option<String>,
    ) -> impl Future<Output = Result<bool, EntryError>> + Send;

    /// Deletes an owned entry. Returns false when nothing was deleted.
    fn delete(
        &self,
        id: EntryId,
        user: &UserId,
    ) -> impl Future<Output = Result<bool, EntryError>> + Send;

    /// Checks whether a row with this id exists for any owner.
    fn exists(&self, id: EntryId) -> impl Future<Output = Result<bool, EntryError>> + Send;

    /// Checks whether any entry, whoever owns it, still points at `image_url`.
    fn image_in_use(&self, image_url: &str)
    -> impl Future<Output = Result<bool, EntryError>> + Send;
}

/// Diary service coordinating the entry store and image storage.
pub struct DiaryService<R: EntryRepository, S: ObjectStorage> {
    repo: Arc<R>,
    storage: Arc<S>,
}

impl<R: EntryRepository, S: ObjectStorage> Clone for DiaryService<R, S> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<R: EntryRepository, S: ObjectStorage> DiaryService<R, S> {
    /// Create a new diary service.
    #[must_use]
    pub fn new(repo: Arc<R>, storage: Arc<S>) -> Self {
        Self { repo, storage }
    }

    /// Lists the caller's entries, newest first.
    ///
    /// A blank category means no filter. Without an identity the list is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn list(
        &self,
        user: Option<&UserId>,
        category: Option<&str>,
    ) -> Result<Vec<DiaryEntry>, EntryError> {
        let Some(user) = user else {
            return Ok(Vec::new());
        };
        let category = category.map(str::trim).filter(|c| !c.is_empty());

        self.repo.list(user, category).await
    }

    /// Returns an empty create form.
    #[must_use]
    pub fn blank_form(&self) -> EntryForm {
        EntryForm::default()
    }

    /// Creates an entry owned by the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No identity is present
    /// - The form fails validation
    /// - The repository fails
    pub async fn create(
        &self,
        user: Option<&UserId>,
        form: EntryForm,
    ) -> Result<DiaryEntry, EntryError> {
        let user = user.ok_or(EntryError::Unauthorized)?;
        let form = form.normalize();
        self.check(&form, None)?;

        let entry = self
            .repo
            .insert(NewEntry {
                user_id: user.clone(),
                title: form.title,
                content: form.content,
                category: form.category,
                created_at: Utc::now(),
                image_url: form.image_url,
            })
            .await?;

        info!(entry_id = %entry.id, user_id = %user, "Diary entry created");
        Ok(entry)
    }

    /// Loads an owned entry into an edit form.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is missing or not owned.
    pub async fn edit_form(
        &self,
        id: EntryId,
        user: Option<&UserId>,
    ) -> Result<EntryForm, EntryError> {
        let entry = self.owned(id, user).await?;
        Ok(EntryForm::from(&entry))
    }

    /// Applies an edit to an owned entry.
    ///
    /// The form must carry the same id as the route. When the image URL
    /// moves from one object to another, the old object is removed after
    /// the row is saved.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The ids disagree, or the entry is missing or not owned
    /// - The form fails validation
    /// - The row vanished or changed during the update
    /// - The repository fails
    pub async fn edit(
        &self,
        id: EntryId,
        user: Option<&UserId>,
        form: EntryForm,
    ) -> Result<DiaryEntry, EntryError> {
        if form.id != Some(id) {
            return Err(EntryError::NotFound(id));
        }
        let user = user.ok_or(EntryError::NotFound(id))?;
        let form = form.normalize();

        let existing = self
            .repo
            .find(id, user)
            .await?
            .ok_or(EntryError::NotFound(id))?;
        self.check(&form, existing.image_url.as_deref())?;

        let Some(updated) = self.repo.update(id, user, form.into_changes()).await? else {
            return Err(self.lost_update(id).await);
        };

        info!(entry_id = %id, user_id = %user, "Diary entry updated");

        if let (Some(old), Some(new)) = (&existing.image_url, &updated.image_url)
            && old != new
        {
            self.discard_image(old).await;
        }

        Ok(updated)
    }

    /// Deletes an owned entry and then its image.
    ///
    /// Missing or foreign entries are ignored so repeated deletes succeed.
    /// Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn delete(&self, id: EntryId, user: Option<&UserId>) -> Result<bool, EntryError> {
        let Some(user) = user else {
            return Ok(false);
        };
        let Some(entry) = self.repo.find(id, user).await? else {
            return Ok(false);
        };

        let deleted = self.repo.delete(id, user).await?;
        if deleted {
            info!(entry_id = %id, user_id = %user, "Diary entry deleted");
        }

        if let Some(url) = &entry.image_url {
            self.discard_image(url).await;
        }
        Ok(deleted)
    }

    /// Detaches and removes the image of an owned entry.
    ///
    /// An entry without an image is left alone and reported as success.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is missing or not owned, or if the
    /// repository fails.
    pub async fn delete_image(&self, id: EntryId, user: Option<&UserId>) -> Result<(), EntryError> {
        let user = user.ok_or(EntryError::NotFound(id))?;
        let entry = self.owned(id, Some(user)).await?;
        let Some(url) = entry.image_url.filter(|url| !url.is_empty()) else {
            return Ok(());
        };

        if !self.repo.set_image(id, user, None).await? {
            return Err(self.lost_update(id).await);
        }

        info!(entry_id = %id, user_id = %user, "Image detached from diary entry");
        self.discard_image(&url).await;
        Ok(())
    }

    /// Fetches an owned entry for read-only display.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is missing or not owned.
    pub async fn preview(
        &self,
        id: EntryId,
        user: Option<&UserId>,
    ) -> Result<DiaryEntry, EntryError> {
        self.owned(id, user).await
    }

    /// Uploads an image and returns its public URL.
    ///
    /// Nothing is persisted; the URL is attached through a later create or edit.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is empty or the storage service fails.
    pub async fn upload_image(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Bytes,
    ) -> Result<String, EntryError> {
        if bytes.is_empty() {
            return Err(EntryError::EmptyUpload);
        }

        let path = new_object_path(file_name);
        let content_type = content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE);

        Ok(self.storage.upload(&path, bytes, content_type).await?)
    }

    async fn owned(&self, id: EntryId, user: Option<&UserId>) -> Result<DiaryEntry, EntryError> {
        let user = user.ok_or(EntryError::NotFound(id))?;
        self.repo
            .find(id, user)
            .await?
            .ok_or(EntryError::NotFound(id))
    }

    /// Maps an update that touched no rows to the right error.
    async fn lost_update(&self, id: EntryId) -> EntryError {
        match self.repo.exists(id).await {
            Ok(true) => EntryError::Conflict(id),
            Ok(false) => EntryError::NotFound(id),
            Err(err) => err,
        }
    }

    /// Runs form rules and checks that a newly attached image is one of ours.
    fn check(&self, form: &EntryForm, current_image: Option<&str>) -> Result<(), EntryError> {
        let mut errors = form.validate().err().unwrap_or_default();

        if let Some(url) = form.image_url.as_deref()
            && current_image != Some(url)
            && !self
                .storage
                .object_path(url)
                .is_some_and(|path| path.starts_with(UPLOAD_PREFIX))
        {
            errors.add("imageUrl", "The image must be uploaded through this site.");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(EntryError::Validation(errors))
        }
    }

    /// Removes an image object no entry refers to any more, logging
    /// instead of failing.
    async fn discard_image(&self, url: &str) {
        match self.repo.image_in_use(url).await {
            Ok(false) => {}
            Ok(true) => {
                debug!(image_url = %url, "Image still referenced, keeping object");
                return;
            }
            Err(err) => {
                warn!(image_url = %url, error = %err, "Could not check image references, keeping object");
                return;
            }
        }

        if let Err(err) = self.storage.delete(url).await {
            warn!(image_url = %url, error = %err, "Failed to delete image from storage");
        }
    }
}

