use crate::api::handlers::person;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn person_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/person",
            get(person::list_people).post(person::create_person),
        )
        .route(
            "/person/:name",
            get(person::get_person)
                .put(person::update_person)
                .delete(person::delete_person),
        )
}
