pub mod dto;
pub mod handlers;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub use services::{Campaign, Dispatcher};

pub fn router() -> Router<AppState> {
    handlers::delivery_routes()
}
