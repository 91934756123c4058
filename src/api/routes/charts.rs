//! Chart Routes
//!
//! - GET /api/v1/graph-types - Supported chart types
//! - POST /api/v1/rank - Suggest a chart type for a list of labels

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::{RankRequest, RankResponse};
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::chart::ChartType;
use crate::selector;

/// GET /api/v1/graph-types
pub async fn list_graph_types() -> Json<Vec<ChartType>> {
    Json(ChartType::all().to_vec())
}

/// POST /api/v1/rank
///
/// Scores every chart type against the submitted labels using the
/// server's weight table.
pub async fn rank_labels(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RankRequest>,
) -> ApiResult<Json<RankResponse>> {
    let ranking = selector::score(&request.labels, &state.weights)?;

    tracing::debug!(
        labels = request.labels.len(),
        suggested = %ranking.suggested,
        "Ranked chart types"
    );

    Ok(Json(ranking.into()))
}
