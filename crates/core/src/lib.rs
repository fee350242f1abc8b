//! Core business logic for the diary service.
//!
//! This crate contains the domain model and orchestration with no web
//! framework or database dependencies. Persistence is reached through the
//! [`entry::EntryRepository`] trait and images through
//! [`storage::ObjectStorage`].
//!
//! # Modules
//!
//! - `entry` - Diary entries, form validation, and the `DiaryService`
//! - `storage` - Bucket layout, object paths, and the storage REST client

pub mod entry;
pub mod storage;
