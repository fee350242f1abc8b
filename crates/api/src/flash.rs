//! One-shot status messages carried across a redirect.
//!
//! A successful form post stores a short code in the `flash` cookie; the
//! next entry list shows the matching message and clears the cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

/// Cookie holding the pending message code.
pub const COOKIE_NAME: &str = "flash";

/// Outcome shown on the next list page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    /// An entry was created.
    Created,
    /// An entry was updated.
    Updated,
    /// An entry was deleted.
    Deleted,
    /// An entry's image was removed.
    ImageDeleted,
}

impl Flash {
    /// Cookie value for this message.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::ImageDeleted => "image-deleted",
        }
    }

    /// Text shown to the user.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Created => "Entry created.",
            Self::Updated => "Entry updated.",
            Self::Deleted => "Entry deleted.",
            Self::ImageDeleted => "Image deleted.",
        }
    }

    /// Parses a cookie value.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "deleted" => Some(Self::Deleted),
            "image-deleted" => Some(Self::ImageDeleted),
            _ => None,
        }
    }
}

fn cookie(value: &'static str) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Queues `flash` for the next page.
#[must_use]
pub fn set(jar: CookieJar, flash: Flash) -> CookieJar {
    jar.add(cookie(flash.code()))
}

/// Reads and clears the pending message.
#[must_use]
pub fn take(jar: CookieJar) -> (CookieJar, Option<&'static str>) {
    let Some(code) = jar.get(COOKIE_NAME).map(|c| c.value().to_string()) else {
        return (jar, None);
    };
    let message = Flash::from_code(&code).map(Flash::message);
    (jar.remove(cookie("")), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Flash::Created, "Entry created.")]
    #[case(Flash::Updated, "Entry updated.")]
    #[case(Flash::Deleted, "Entry deleted.")]
    #[case(Flash::ImageDeleted, "Image deleted.")]
    fn test_set_then_take(#[case] flash: Flash, #[case] message: &str) {
        let jar = set(CookieJar::new(), flash);
        assert_eq!(Flash::from_code(flash.code()), Some(flash));

        let (jar, taken) = take(jar);
        assert_eq!(taken, Some(message));
        assert!(jar.get(COOKIE_NAME).is_none());
    }

    #[test]
    fn test_unknown_code_is_dropped() {
        let jar = CookieJar::new().add(Cookie::new(COOKIE_NAME, "<script>"));
        let (jar, taken) = take(jar);
        assert_eq!(taken, None);
        assert!(jar.get(COOKIE_NAME).is_none());
    }

    #[test]
    fn test_take_without_cookie() {
        let (_, taken) = take(CookieJar::new());
        assert_eq!(taken, None);
    }
}
