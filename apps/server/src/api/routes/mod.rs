//! Route tables, nested under `/api` by [`create_router`](crate::api::create_router)

mod course;
mod person;

use crate::state::AppState;
use axum::Router;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(person::person_routes())
        .merge(course::course_routes())
}
