use crate::api::handlers::course;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn course_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/course",
            get(course::list_courses).post(course::create_course),
        )
        .route(
            "/course/:id",
            get(course::get_course)
                .put(course::update_course)
                .delete(course::delete_course),
        )
}
