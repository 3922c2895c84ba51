mod dto;
pub mod handlers;
pub mod model;
pub mod nutrition;
pub mod pipeline;
pub mod prompt;
pub mod repo;
pub mod shopping;
pub mod validator;
pub mod writer;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::plan_routes())
}
