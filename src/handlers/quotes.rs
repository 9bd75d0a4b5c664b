use axum::{extract::State, Json};
use std::sync::Arc;

use crate::models::item::QuoteRequest;
use crate::models::pricing::QuoteResponse;
use crate::services::AppState;

use super::AppError;

pub async fn instant_quote(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, AppError> {
    let response = state.quotes.quote(&request).await?;
    Ok(Json(response))
}
