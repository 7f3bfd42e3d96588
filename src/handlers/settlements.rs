use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::{Delivery, IsoMessage, PartyRef, Settlement};
use crate::error::AppError;
use crate::secrets::SigningSecret;
use crate::services::SettlementRequest;
use crate::AppState;

#[derive(Deserialize, ToSchema, IntoParams)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Serialize, ToSchema)]
pub struct SettlementListResponse {
    pub settlements: Vec<Settlement>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Serialize, ToSchema)]
pub struct SettlementDetailResponse {
    pub settlement: Settlement,
    pub delivery: Delivery,
}

/// Submission body. Deliberately no `Debug` derive: the seed must never
/// reach a log line.
#[derive(Deserialize, ToSchema)]
pub struct SubmitSettlementBody {
    #[schema(value_type = String)]
    pub weight_kg: Decimal,
    #[schema(value_type = String)]
    pub price_per_kg: Decimal,
    pub currency: String,
    pub operator: PartyRef,
    pub producer: PartyRef,
    pub seed: String,
    pub notes: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct SubmitSettlementResponse {
    pub settlement: Settlement,
    pub delivery: Delivery,
    pub messages: Vec<IsoMessage>,
}

/// List settlements, newest first
#[utoipa::path(
    get,
    path = "/settlements",
    params(Pagination),
    responses(
        (status = 200, description = "Settlement page", body = SettlementListResponse),
        (status = 500, description = "Database error")
    ),
    tag = "Settlements"
)]
pub async fn list_settlements(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<impl IntoResponse, AppError> {
    let limit = pagination.limit.unwrap_or(20).clamp(1, 100);
    let offset = pagination.offset.unwrap_or(0).max(0);

    let settlements = state.store.list_settlements(limit, offset).await?;

    Ok(Json(SettlementListResponse {
        settlements,
        limit,
        offset,
    }))
}

/// Get a settlement by ID
///
/// Returns the settlement together with its delivery.
#[utoipa::path(
    get,
    path = "/settlements/{id}",
    params(
        ("id" = Uuid, Path, description = "Settlement ID")
    ),
    responses(
        (status = 200, description = "Settlement found", body = SettlementDetailResponse),
        (status = 404, description = "Settlement not found"),
        (status = 500, description = "Database error")
    ),
    tag = "Settlements"
)]
pub async fn get_settlement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let settlement = state.store.get_settlement(id).await?;
    let delivery = state.store.delivery_for(id).await?;

    Ok(Json(SettlementDetailResponse {
        settlement,
        delivery,
    }))
}

/// Get the ISO 20022 messages generated for a settlement
#[utoipa::path(
    get,
    path = "/settlements/{id}/messages",
    params(
        ("id" = Uuid, Path, description = "Settlement ID")
    ),
    responses(
        (status = 200, description = "Messages for the settlement", body = Vec<IsoMessage>),
        (status = 404, description = "Settlement not found"),
        (status = 500, description = "Database error")
    ),
    tag = "Settlements"
)]
pub async fn get_settlement_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    // 404 for unknown ids rather than an empty list.
    state.store.get_settlement(id).await?;
    let messages = state.store.messages_for(id).await?;

    Ok(Json(messages))
}

/// Submit a settlement
///
/// Records a delivery, pays the producer on the ledger and persists the
/// settlement with its ISO 20022 messages.
#[utoipa::path(
    post,
    path = "/settlements",
    request_body = SubmitSettlementBody,
    responses(
        (status = 201, description = "Settlement recorded", body = SubmitSettlementResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Integrity failure, manual reconciliation required"),
        (status = 422, description = "Transfer rejected by the ledger"),
        (status = 502, description = "Ledger unreachable"),
        (status = 504, description = "Submission outcome unknown")
    ),
    tag = "Settlements"
)]
pub async fn submit_settlement(
    State(state): State<AppState>,
    Json(body): Json<SubmitSettlementBody>,
) -> Result<impl IntoResponse, AppError> {
    // The seed string is moved into the wrapper, never copied; the wrapper
    // zeroes it after the coordinator consumes it.
    let secret = SigningSecret::new(body.seed);

    let request = SettlementRequest {
        weight_kg: body.weight_kg,
        price_per_kg: body.price_per_kg,
        currency: body.currency,
        operator: body.operator,
        producer: Some(body.producer),
        notes: body.notes,
    };

    let outcome = state.coordinator.submit_settlement(request, secret).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitSettlementResponse {
            settlement: outcome.settlement,
            delivery: outcome.delivery,
            messages: outcome.messages,
        }),
    ))
}
