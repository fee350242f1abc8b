//! Diary entries: domain types, validation, and the service that
//! coordinates the entry store with image storage.
//!
//! Every operation takes the caller's identity explicitly. An absent
//! identity owns nothing, and entries owned by someone else are reported
//! as not found so their existence never leaks.

mod error;
mod service;
mod types;


pub use error::EntryError;
pub use service::{DiaryService, EntryRepository};
pub use types::{
    CATEGORY_MAX_LEN, DiaryEntry, EntryChanges, EntryForm, FieldErrors, NewEntry, TITLE_MAX_LEN,
};
