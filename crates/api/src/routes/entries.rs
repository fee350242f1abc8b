//! Diary entry routes.
//!
//! Reads return JSON. Successful form posts answer `303 See Other` back to
//! the list with a flash message; a failed validation re-shows the form
//! with `422` and per-field errors.

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    error::ApiError,
    flash::{self, Flash},
    middleware::CurrentUser,
};
use diary_core::entry::{DiaryEntry, EntryError, EntryForm, FieldErrors};
use diary_shared::EntryId;

/// Where every successful post lands.
const LIST_PATH: &str = "/entries";

/// Creates the entries router (requires identity middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/entries", get(list_entries).post(create_entry))
        .route("/entries/new", get(new_entry_form))
        .route("/entries/{id}", post(edit_entry))
        .route("/entries/{id}/edit", get(edit_entry_form))
        .route("/entries/{id}/delete", post(delete_entry))
        .route("/entries/{id}/image/delete", post(delete_entry_image))
        .route("/entries/{id}/preview", get(preview_entry))
}

/// Query parameters for the list.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Only entries with exactly this category.
    pub category: Option<String>,
}

/// List response.
#[derive(Debug, Serialize)]
pub struct EntryListResponse {
    /// Entries, newest first.
    pub entries: Vec<DiaryEntry>,
    /// One-shot status message from the previous post.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<&'static str>,
}

/// Form view, also used to re-show a rejected submission.
#[derive(Debug, Serialize)]
pub struct FormResponse {
    /// Field values.
    pub form: EntryForm,
    /// Messages per field, empty on first display.
    pub errors: FieldErrors,
}

/// Preview response.
#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    /// The entry.
    pub entry: DiaryEntry,
}

fn redirect_with(jar: CookieJar, message: Flash) -> Response {
    (flash::set(jar, message), Redirect::to(LIST_PATH)).into_response()
}

fn invalid_form(form: EntryForm, errors: FieldErrors) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(FormResponse { form, errors }),
    )
        .into_response()
}

/// GET /entries - List the caller's entries.
async fn list_entries(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state
        .diary()
        .list(user.id(), query.category.as_deref())
        .await?;
    let (jar, flash) = flash::take(jar);

    Ok((jar, Json(EntryListResponse { entries, flash })))
}

/// GET /entries/new - Empty create form.
async fn new_entry_form(State(state): State<AppState>) -> Json<FormResponse> {
    Json(FormResponse {
        form: state.diary().blank_form(),
        errors: FieldErrors::default(),
    })
}

/// POST /entries - Create an entry.
async fn create_entry(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Form(form): Form<EntryForm>,
) -> Result<Response, ApiError> {
    match state.diary().create(user.id(), form.clone()).await {
        Ok(_) => Ok(redirect_with(jar, Flash::Created)),
        Err(EntryError::Validation(errors)) => Ok(invalid_form(form, errors)),
        Err(err) => Err(err.into()),
    }
}

/// GET /entries/{id}/edit - Edit form for an owned entry.
async fn edit_entry_form(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<FormResponse>, ApiError> {
    let form = state.diary().edit_form(EntryId(id), user.id()).await?;
    Ok(Json(FormResponse {
        form,
        errors: FieldErrors::default(),
    }))
}

/// POST /entries/{id} - Save an edit.
async fn edit_entry(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(id): Path<i32>,
    Form(form): Form<EntryForm>,
) -> Result<Response, ApiError> {
    match state.diary().edit(EntryId(id), user.id(), form.clone()).await {
        Ok(_) => Ok(redirect_with(jar, Flash::Updated)),
        Err(EntryError::Validation(errors)) => Ok(invalid_form(form, errors)),
        Err(err) => Err(err.into()),
    }
}

/// POST /entries/{id}/delete - Delete an entry and its image.
async fn delete_entry(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    if state.diary().delete(EntryId(id), user.id()).await? {
        Ok(redirect_with(jar, Flash::Deleted))
    } else {
        Ok(Redirect::to(LIST_PATH).into_response())
    }
}

/// POST /entries/{id}/image/delete - Remove an entry's image.
async fn delete_entry_image(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    state.diary().delete_image(EntryId(id), user.id()).await?;
    Ok(redirect_with(jar, Flash::ImageDeleted))
}

/// GET /entries/{id}/preview - Read-only view of an owned entry.
async fn preview_entry(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let entry = state.diary().preview(EntryId(id), user.id()).await?;
    Ok(Json(PreviewResponse { entry }))
}
