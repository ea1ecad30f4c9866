use std::time::Duration;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::{extract::{Query, State}, routing::post, Json, Router};

use crate::application::context::RequestContext;
use crate::application::error::Outcome;
use crate::application::todo_service::TodoService;
use crate::domain::todo::{CreateTodo, PageRequest, UpdateTodo};
use crate::http::types::{ApiError, DeleteRequest, DeleteResponse, ListQuery, TodoListResponse, TodoResponse};

#[derive(Clone)]
pub struct AppState<S: TodoService> {
    pub service: S,
    pub request_timeout: Duration,
}

impl<S: TodoService> AppState<S> {
    pub fn new(service: S) -> Self { Self { service, request_timeout: Duration::from_secs(30) } }

    fn context(&self) -> RequestContext { RequestContext::background().with_timeout(self.request_timeout) }
}

pub fn router<S: TodoService + Clone + Send + Sync + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route(
            "/todos",
            post(create_todo::<S>).get(list_todos::<S>).put(update_todo::<S>).delete(delete_todos::<S>),
        )
        .with_state(state)
}

async fn create_todo<S: TodoService>(
    State(state): State<AppState<S>>,
    payload: Result<Json<CreateTodo>, JsonRejection>,
) -> Result<Json<TodoResponse>, ApiError> {
    let Json(payload) = payload?;
    if payload.subject.is_empty() {
        return Err(ApiError::bad_request("subject must not be null or empty"));
    }
    match state.service.create(&state.context(), payload).await? {
        Outcome::Persisted(todo) => Ok(Json(TodoResponse { todo })),
        Outcome::Rejected(rejection) => Err(rejection.into()),
    }
}

async fn list_todos<S: TodoService>(
    State(state): State<AppState<S>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<TodoListResponse>, ApiError> {
    let Query(query) = query?;
    let page = page_request(&query)?;
    let todos = state.service.list(&state.context(), page).await?;
    Ok(Json(TodoListResponse { todos }))
}

async fn update_todo<S: TodoService>(
    State(state): State<AppState<S>>,
    payload: Result<Json<UpdateTodo>, JsonRejection>,
) -> Result<Json<TodoResponse>, ApiError> {
    let Json(payload) = payload?;
    if payload.id.is_zero() {
        return Err(ApiError::bad_request("id must not be null or empty"));
    }
    if payload.subject.is_empty() {
        return Err(ApiError::bad_request("subject must not be null or empty"));
    }
    match state.service.update(&state.context(), payload).await? {
        Outcome::Persisted(todo) => Ok(Json(TodoResponse { todo })),
        Outcome::Rejected(rejection) => Err(rejection.into()),
    }
}

async fn delete_todos<S: TodoService>(
    State(state): State<AppState<S>>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let Json(payload) = payload?;
    state.service.delete(&state.context(), &payload.ids).await?;
    Ok(Json(DeleteResponse::default()))
}

fn page_request(query: &ListQuery) -> Result<PageRequest, ApiError> {
    let prev_id = query.prev_id.unwrap_or(0);
    if prev_id < 0 {
        return Err(ApiError::bad_request("prev_id must not be negative"));
    }
    let size = query.size.unwrap_or(0);
    if size < 0 {
        return Err(ApiError::bad_request("size must not be negative"));
    }
    Ok(PageRequest { prev_id, size: u32::try_from(size).unwrap_or(u32::MAX) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_params_mean_first_default_page() {
        let page = page_request(&ListQuery { prev_id: None, size: None }).unwrap();
        assert_eq!(page, PageRequest { prev_id: 0, size: 0 });
    }

    #[test]
    fn negative_params_are_rejected() {
        assert!(page_request(&ListQuery { prev_id: Some(-1), size: None }).is_err());
        assert!(page_request(&ListQuery { prev_id: None, size: Some(-3) }).is_err());
    }

    #[test]
    fn oversized_size_saturates() {
        let page = page_request(&ListQuery { prev_id: Some(9), size: Some(i64::MAX) }).unwrap();
        assert_eq!(page, PageRequest { prev_id: 9, size: u32::MAX });
    }
}
