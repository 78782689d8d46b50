//! Ticket endpoint handlers
//!
//! Handlers are thin: they decode the request, call into
//! [`MatchmakingService`] and encode the result. The core operations are
//! synchronous and short, so they run inline on the request task.

use crate::api::error::ApiError;
use crate::error::MatchmakingError;
use crate::matchmaking::MatchmakingService;
use crate::types::{PlayerId, QueueName, TicketId, TicketView};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Caller identity, passed as `?user_id=`
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: PlayerId,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub user_id: PlayerId,
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTicketRequest {
    pub queue: QueueName,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTicketResponse {
    pub id: TicketId,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateServerRequest {
    pub id: String,
    pub join_code: String,
}

/// Unparseable ids cannot name a ticket
fn parse_ticket_id(raw: &str) -> Result<TicketId, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        ApiError(MatchmakingError::TicketNotFound {
            ticket_id: raw.to_string(),
        })
    })
}

/// Unwrap a query string, mapping deserialization failures to `BadRequest`
fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    result.map(|Query(value)| value).map_err(|err| {
        ApiError(MatchmakingError::BadRequest {
            reason: err.body_text(),
        })
    })
}

/// Unwrap a JSON body, mapping deserialization failures to `BadRequest`
fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    result.map(|Json(value)| value).map_err(|err| {
        ApiError(MatchmakingError::BadRequest {
            reason: err.body_text(),
        })
    })
}

/// `POST /tickets`
pub async fn create_ticket(
    State(service): State<MatchmakingService>,
    user: Result<Query<UserQuery>, QueryRejection>,
    request: Result<Json<CreateTicketRequest>, JsonRejection>,
) -> Result<Json<CreateTicketResponse>, ApiError> {
    let user = extract_query(user)?;
    let request = extract_json(request)?;
    debug!(
        "Ticket requested by '{}' for queue '{}'",
        user.user_id, request.queue
    );

    let id = service.create_ticket(&request.queue, &user.user_id)?;
    Ok(Json(CreateTicketResponse { id }))
}

/// `GET /tickets`
pub async fn get_ticket(
    State(service): State<MatchmakingService>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Result<Json<TicketView>, ApiError> {
    let query = extract_query(query)?;
    let id = parse_ticket_id(&query.id)?;
    Ok(Json(service.get_status(id, &query.user_id)?))
}

/// `POST /tickets/update_server`
pub async fn update_server(
    State(service): State<MatchmakingService>,
    user: Result<Query<UserQuery>, QueryRejection>,
    request: Result<Json<UpdateServerRequest>, JsonRejection>,
) -> Result<Json<TicketView>, ApiError> {
    let user = extract_query(user)?;
    let request = extract_json(request)?;
    let id = parse_ticket_id(&request.id)?;
    Ok(Json(service.set_join_code(
        id,
        &user.user_id,
        &request.join_code,
    )?))
}
