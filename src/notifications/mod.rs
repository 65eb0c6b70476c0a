use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod fanout;
pub mod handlers;
pub mod repo;

pub use dto::NotificationCategory;

pub fn router() -> Router<AppState> {
    handlers::router()
}
