//! HTTP API for ticket-based matchmaking
//!
//! Routes:
//! - `POST /tickets?user_id=` with `{"queue"}` issues a ticket
//! - `GET /tickets?user_id=&id=` polls a ticket
//! - `POST /tickets/update_server?user_id=` with `{"id", "joinCode"}` lets the
//!   initiator publish the server join code

pub mod error;
pub mod handlers;

pub use error::{ApiError, ErrorBody};

use crate::matchmaking::MatchmakingService;
use axum::routing::{get, post};
use axum::Router;

/// Router for the ticket endpoints
pub fn router(service: MatchmakingService) -> Router {
    Router::new()
        .route(
            "/tickets",
            post(handlers::create_ticket).get(handlers::get_ticket),
        )
        .route("/tickets/update_server", post(handlers::update_server))
        .with_state(service)
}
