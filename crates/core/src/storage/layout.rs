//! Bucket URL layout and object path generation.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use url::Url;
use uuid::Uuid;

/// Folder every uploaded image is placed under.
pub const UPLOAD_PREFIX: &str = "uploads/";

/// Bytes kept verbatim in generated object names.
///
/// Everything outside `A-Z a-z 0-9 - . _ ~` is escaped, so a name with
/// spaces, slashes or non-ASCII characters becomes a single path segment.
const OBJECT_NAME: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Name used when an upload carries no usable file name.
const FALLBACK_NAME: &str = "image";

/// Where a bucket lives and how its object URLs are shaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketLayout {
    base_url: String,
    bucket: String,
}

impl BucketLayout {
    /// Creates a layout for `bucket` on the storage project at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, bucket: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.into(),
        }
    }

    /// Returns the bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// URL objects are uploaded to.
    #[must_use]
    pub fn upload_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{path}", self.base_url, self.bucket)
    }

    /// URL objects are removed through.
    #[must_use]
    pub fn remove_url(&self) -> String {
        format!("{}/storage/v1/object/{}", self.base_url, self.bucket)
    }

    /// Publicly readable URL of an object.
    #[must_use]
    pub fn public_url(&self, path: &str) -> String {
        format!("{}{path}", self.public_prefix())
    }

    /// Resolves a public URL back to the decoded object path.
    ///
    /// Both URLs are parsed, so scheme and host compare case-insensitively
    /// and dot segments are resolved before the bucket prefix is checked.
    /// Returns `None` for URLs that point outside this bucket.
    #[must_use]
    pub fn object_path(&self, public_url: &str) -> Option<String> {
        let url = Url::parse(public_url.trim()).ok()?;
        let prefix = Url::parse(&self.public_prefix()).ok()?;
        if url.origin() != prefix.origin() {
            return None;
        }

        let encoded = url.path().strip_prefix(prefix.path())?;
        if encoded.is_empty() {
            return None;
        }

        let decoded = percent_decode_str(encoded).decode_utf8().ok()?;
        if decoded.split('/').any(|segment| matches!(segment, "" | "." | "..")) {
            return None;
        }
        Some(decoded.into_owned())
    }

    fn public_prefix(&self) -> String {
        format!("{}/storage/v1/object/public/{}/", self.base_url, self.bucket)
    }
}

/// Builds a collision-resistant object path for an uploaded file.
///
/// Format: `uploads/{percent-encoded "{uuid}_{basename}"}`. Directory
/// components a browser may send along with the name are dropped.
#[must_use]
pub fn new_object_path(file_name: &str) -> String {
    object_path_with_token(Uuid::new_v4(), file_name)
}

fn object_path_with_token(token: Uuid, file_name: &str) -> String {
    let basename = file_name
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_NAME);

    let name = format!("{token}_{basename}");
    format!("{UPLOAD_PREFIX}{}", utf8_percent_encode(&name, OBJECT_NAME))
}
