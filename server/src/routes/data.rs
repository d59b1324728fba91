use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use streamgate_core::{bounded, sanitize_for_transport};

use super::{ok_with, present, JsonBody};
use crate::error::{ApiError, ApiResult};
use crate::pipeline::PublishRequest;
use crate::state::AppState;

pub async fn publish(
    State(state): State<AppState>,
    JsonBody(b): JsonBody<PublishRequest>,
) -> ApiResult<Json<Value>> {
    let published = state.pipeline.publish(b).await?;
    Ok(ok_with(json!({}), published))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetByKeyBody {
    label: Option<String>,
    schema_id: Option<String>,
    publisher: Option<String>,
    data_id: Option<String>,
}

pub async fn get_by_key(
    State(state): State<AppState>,
    JsonBody(b): JsonBody<GetByKeyBody>,
) -> ApiResult<Json<Value>> {
    let schema_id = present(b.schema_id).or_else(|| {
        present(b.label)
            .and_then(|l| state.registry.latest(&l))
            .map(|e| e.schema_id)
    });
    let (Some(schema_id), Some(publisher), Some(data_id)) =
        (schema_id, present(b.publisher), present(b.data_id))
    else {
        return Err(ApiError::validation(
            "schemaId_or_label_publisher_dataId_required",
        ));
    };
    let data = bounded(
        state.config.remote_timeout(),
        state.remote.fetch_by_key(&schema_id, &publisher, &data_id),
    )
    .await?;
    Ok(Json(json!({ "ok": true, "data": sanitize_for_transport(data) })))
}
