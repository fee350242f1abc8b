//! Diary entry types.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use diary_shared::types::{EntryId, UserId};
use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

/// Longest accepted title, in characters.
pub const TITLE_MAX_LEN: usize = 200;

/// Longest accepted category, in characters.
pub const CATEGORY_MAX_LEN: usize = 100;

/// A stored diary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaryEntry {
    /// Store-assigned id.
    pub id: EntryId,
    /// Title, never empty.
    pub title: String,
    /// Body text, may be empty.
    pub content: String,
    /// Free-form label used for filtering, may be empty.
    pub category: String,
    /// Creation time in UTC. Never changes after insert.
    pub created_at: DateTime<Utc>,
    /// Public URL of the attached image.
    pub image_url: Option<String>,
    /// Owner. Rows written before ownership existed have none.
    pub user_id: Option<UserId>,
}

impl DiaryEntry {
    /// Returns true when `user` owns this entry.
    #[must_use]
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.user_id.as_ref() == Some(user)
    }
}

/// Create/edit form as submitted by the browser.
///
/// Owner and creation time are not part of the form. They come from the
/// session and the clock, so client-posted values are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct EntryForm {
    /// Id echoed back by the edit form. Anything that is not a number
    /// reads as `None`, which never matches a route id.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_id"
    )]
    pub id: Option<EntryId>,
    /// Title.
    #[validate(
        custom(function = "not_blank"),
        length(max = 200, message = "The Title field must be at most 200 characters.")
    )]
    pub title: String,
    /// Body text.
    pub content: String,
    /// Category label.
    #[validate(length(max = 100, message = "The Category field must be at most 100 characters."))]
    pub category: String,
    /// Public URL returned by the upload endpoint.
    pub image_url: Option<String>,
}

impl EntryForm {
    /// Trims title and category and turns a blank image URL into `None`.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.category = self.category.trim().to_string();
        self.image_url = self
            .image_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        self
    }

    /// Checks field rules, collecting every failure.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        Validate::validate(self).map_err(FieldErrors::from)
    }

    /// Splits the form into the fields an edit may change.
    #[must_use]
    pub fn into_changes(self) -> EntryChanges {
        EntryChanges {
            title: self.title,
            content: self.content,
            category: self.category,
            image_url: self.image_url,
        }
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required")
            .with_message(Cow::Borrowed("The Title field is required.")));
    }
    Ok(())
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<EntryId>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i32),
        Text(String),
    }

    Ok(match Option::<RawId>::deserialize(deserializer)? {
        Some(RawId::Number(id)) => Some(EntryId(id)),
        Some(RawId::Text(text)) => text.parse().ok(),
        None => None,
    })
}

impl From<&DiaryEntry> for EntryForm {
    fn from(entry: &DiaryEntry) -> Self {
        Self {
            id: Some(entry.id),
            title: entry.title.clone(),
            content: entry.content.clone(),
            category: entry.category.clone(),
            image_url: entry.image_url.clone(),
        }
    }
}

/// Field-level validation messages keyed by form field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Records a message for `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Returns true when no field has a message.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = Self::default();
        for (field, failures) in errors.field_errors() {
            for failure in failures {
                let message = failure
                    .message
                    .as_ref()
                    .map_or_else(|| failure.code.to_string(), ToString::to_string);
                fields.add(&field, message);
            }
        }
        fields
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.values().flatten().map(String::as_str).collect();
        f.write_str(&messages.join(" "))
    }
}

/// Data for inserting a new entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    /// Owner taken from the session.
    pub user_id: UserId,
    /// Title.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Category label.
    pub category: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Attached image URL.
    pub image_url: Option<String>,
}

/// Fields an edit may change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryChanges {
    /// Title.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Category label.
    pub category: String,
    /// Attached image URL, `None` detaches.
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn form(title: &str) -> EntryForm {
        EntryForm {
            title: title.to_string(),
            ..EntryForm::default()
        }
    }

    #[test]
    fn test_normalize_trims_and_clears_blank_image() {
        let form = EntryForm {
            id: None,
            title: "  Morning  ".into(),
            content: "  kept as typed ".into(),
            category: " daily ".into(),
            image_url: Some("   ".into()),
        }
        .normalize();

        assert_eq!(form.title, "Morning");
        assert_eq!(form.content, "  kept as typed ");
        assert_eq!(form.category, "daily");
        assert_eq!(form.image_url, None);
    }

    #[rstest]
    #[case("", true)]
    #[case("   ", true)]
    #[case("A", false)]
    fn test_title_required(#[case] title: &str, #[case] fails: bool) {
        let result = form(title).validate();
        assert_eq!(result.is_err(), fails);
        if let Err(errors) = result {
            assert_eq!(
                errors.get("title"),
                Some(&["The Title field is required.".to_string()][..])
            );
        }
    }

    #[test]
    fn test_length_limits() {
        let mut form = form(&"t".repeat(TITLE_MAX_LEN + 1));
        form.category = "c".repeat(CATEGORY_MAX_LEN + 1);

        let errors = form.validate().unwrap_err();
        assert!(errors.get("title").is_some());
        assert!(errors.get("category").is_some());

        let at_limit = EntryForm {
            title: "é".repeat(TITLE_MAX_LEN),
            category: "c".repeat(CATEGORY_MAX_LEN),
            ..EntryForm::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[rstest]
    #[case(r#"{"id":4}"#, Some(EntryId(4)))]
    #[case(r#"{"id":"4"}"#, Some(EntryId(4)))]
    #[case(r#"{"id":""}"#, None)]
    #[case(r#"{"id":"abc"}"#, None)]
    #[case(r#"{"id":null}"#, None)]
    #[case("{}", None)]
    fn test_unreadable_id_becomes_none(#[case] json: &str, #[case] expected: Option<EntryId>) {
        let form: EntryForm = serde_json::from_str(json).unwrap();
        assert_eq!(form.id, expected);
    }

    #[test]
    fn test_length_messages_name_the_limit() {
        let mut form = form(&"t".repeat(TITLE_MAX_LEN + 1));
        form.category = "c".repeat(CATEGORY_MAX_LEN + 1);

        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.get("title"),
            Some(&[format!("The Title field must be at most {TITLE_MAX_LEN} characters.")][..])
        );
        assert_eq!(
            errors.get("category"),
            Some(&[format!("The Category field must be at most {CATEGORY_MAX_LEN} characters.")][..])
        );
    }

    #[test]
    fn test_form_ignores_client_owner_and_timestamp() {
        let json = r#"{"title":"A","userId":"intruder","createdAt":"2001-01-01T00:00:00Z","imageUrl":"u"}"#;
        let form: EntryForm = serde_json::from_str(json).unwrap();

        assert_eq!(form.title, "A");
        assert_eq!(form.content, "");
        assert_eq!(form.image_url.as_deref(), Some("u"));
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let entry = DiaryEntry {
            id: EntryId(1),
            title: "A".into(),
            content: String::new(),
            category: "daily".into(),
            created_at: DateTime::from_timestamp(0, 0).unwrap(),
            image_url: None,
            user_id: Some(UserId::new("u1")),
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["createdAt"], "1970-01-01T00:00:00Z");
        assert_eq!(value["imageUrl"], serde_json::Value::Null);
        assert_eq!(value["userId"], "u1");
        assert!(entry.is_owned_by(&UserId::new("u1")));
        assert!(!entry.is_owned_by(&UserId::new("u2")));
    }
}
