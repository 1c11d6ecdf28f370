//! Person handlers
//!
//! People are addressed by a URL-encoded "First Last" path segment. Path
//! captures arrive already percent-decoded, so the name is cut from the
//! original URI instead and decoded exactly once by [`resolve_full_name`].

use crate::{
    identity::{resolve_full_name, FullName},
    models::{Person, PersonPayload, PersonWithCourses},
    state::AppState,
    Error, Result,
};
use axum::{
    extract::{rejection::JsonRejection, OriginalUri, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// `/api/person/:name` has the name as its final segment.
fn name_param(uri: &Uri) -> Result<FullName> {
    let raw = uri
        .path()
        .rsplit('/')
        .next()
        .ok_or_else(|| Error::Internal(format!("no name segment in '{}'", uri.path())))?;
    resolve_full_name(raw)
}

pub async fn list_people(State(state): State<AppState>) -> Result<Json<Vec<Person>>> {
    let people = state.person_service.list().await?;
    Ok(Json(people))
}

pub async fn get_person(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<PersonWithCourses>> {
    let name = name_param(&uri)?;
    let person = state.person_service.get_by_name(&name).await?;
    Ok(Json(person))
}

pub async fn create_person(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PersonPayload>, JsonRejection>,
) -> Result<Response> {
    let Json(payload) = payload?;
    let created = state.person_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

pub async fn update_person(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    payload: std::result::Result<Json<PersonPayload>, JsonRejection>,
) -> Result<Json<PersonWithCourses>> {
    let name = name_param(&uri)?;
    let Json(payload) = payload?;
    let updated = state.person_service.update(&name, payload).await?;
    Ok(Json(updated))
}

pub async fn delete_person(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<serde_json::Value>> {
    let name = name_param(&uri)?;
    state.person_service.delete(&name).await?;
    Ok(Json(json!({ "message": "Person deleted successfully" })))
}
