//! Course handlers

use crate::{
    identity::parse_id,
    models::{Course, CoursePayload},
    state::AppState,
    Result,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>> {
    let courses = state.course_service.list().await?;
    Ok(Json(courses))
}

pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Course>> {
    let id = parse_id(&id)?;
    let course = state.course_service.get(id).await?;
    Ok(Json(course))
}

pub async fn create_course(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CoursePayload>, JsonRejection>,
) -> Result<Response> {
    let Json(payload) = payload?;
    let course = state.course_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(course)).into_response())
}

pub async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<CoursePayload>, JsonRejection>,
) -> Result<Json<Course>> {
    let id = parse_id(&id)?;
    let Json(payload) = payload?;
    let course = state.course_service.update(id, payload).await?;
    Ok(Json(course))
}

pub async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let id = parse_id(&id)?;
    state.course_service.delete(id).await?;
    Ok(Json(json!({ "message": "Course deleted successfully" })))
}
