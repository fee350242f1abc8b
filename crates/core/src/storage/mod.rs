//! Object storage for diary images.
//!
//! Images live in a single bucket of a Supabase-style storage service and
//! are addressed by their public URL once uploaded:
//!
//! ```text
//! upload  POST   {base}/storage/v1/object/{bucket}/{path}
//! public  GET    {base}/storage/v1/object/public/{bucket}/{path}
//! delete  DELETE {base}/storage/v1/object/{bucket}   {"prefixes": [path]}
//! ```
//!
//! Generated paths are percent-encoded when the URL is built and decoded
//! again when a stored public URL is resolved back to an object path.

mod error;
mod layout;
mod service;

pub use error::StorageError;
pub use layout::{BucketLayout, UPLOAD_PREFIX, new_object_path};
pub use service::{ObjectStorage, StorageClient};
