use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use streamgate_registry::SchemaRef;

use super::{ok_with, present, JsonBody};
use crate::error::{ApiError, ApiResult};
use crate::pipeline::EncodeRequest;
use crate::state::AppState;

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct ComputeBody {
    schema: Option<String>,
}

pub async fn compute(
    State(state): State<AppState>,
    JsonBody(b): JsonBody<ComputeBody>,
) -> ApiResult<Json<Value>> {
    let schema = present(b.schema).ok_or_else(|| ApiError::validation("schema_required"))?;
    let schema_id = state.registry.compute_schema_id(&schema).await?;
    Ok(Json(json!({ "ok": true, "schemaId": schema_id })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBody {
    label: Option<String>,
    version: Option<String>,
    schema: Option<String>,
    parent_schema_id: Option<String>,
    #[serde(default = "default_true")]
    ignore_if_registered: bool,
}

impl Default for RegisterBody {
    fn default() -> Self {
        Self {
            label: None,
            version: None,
            schema: None,
            parent_schema_id: None,
            ignore_if_registered: true,
        }
    }
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(b): JsonBody<RegisterBody>,
) -> ApiResult<Json<Value>> {
    let (Some(label), Some(schema)) = (present(b.label), present(b.schema)) else {
        return Err(ApiError::validation("label_and_schema_required"));
    };
    let parent = present(b.parent_schema_id);
    let entry = state
        .registry
        .register_latest(&label, &schema, parent.as_deref(), b.ignore_if_registered)
        .await?;
    Ok(Json(json!({ "ok": true, "label": label, "schemaId": entry.schema_id })))
}

pub async fn register_version(
    State(state): State<AppState>,
    JsonBody(b): JsonBody<RegisterBody>,
) -> ApiResult<Json<Value>> {
    let (Some(label), Some(version), Some(schema)) =
        (present(b.label), present(b.version), present(b.schema))
    else {
        return Err(ApiError::validation("label_version_schema_required"));
    };
    let parent = present(b.parent_schema_id);
    let entry = state
        .registry
        .register_version(&label, &version, &schema, parent.as_deref(), b.ignore_if_registered)
        .await?;
    Ok(Json(json!({
        "ok": true,
        "label": label,
        "version": version,
        "schemaId": entry.schema_id,
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct LabelVersionBody {
    label: Option<String>,
    version: Option<String>,
    deprecated: Option<bool>,
}

impl LabelVersionBody {
    fn required(self) -> ApiResult<(String, String, Option<bool>)> {
        match (present(self.label), present(self.version)) {
            (Some(label), Some(version)) => Ok((label, version, self.deprecated)),
            _ => Err(ApiError::validation("label_and_version_required")),
        }
    }
}

pub async fn set_latest(
    State(state): State<AppState>,
    JsonBody(b): JsonBody<LabelVersionBody>,
) -> ApiResult<Json<Value>> {
    let (label, version, _) = b.required()?;
    let promoted = state.registry.set_latest(&label, &version).await?;
    Ok(Json(json!({
        "ok": true,
        "label": label,
        "version": version,
        "schemaId": promoted.schema_id,
    })))
}

pub async fn deprecate(
    State(state): State<AppState>,
    JsonBody(b): JsonBody<LabelVersionBody>,
) -> ApiResult<Json<Value>> {
    let (label, version, deprecated) = b.required()?;
    let entry = state
        .registry
        .deprecate(&label, &version, deprecated.unwrap_or(true))
        .await?;
    Ok(Json(json!({
        "ok": true,
        "label": label,
        "version": version,
        "deprecated": entry.deprecated,
    })))
}

pub async fn list(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "ok": true, "schemas": state.registry.all_latest() }))
}

pub async fn latest(
    State(state): State<AppState>,
    Path(label): Path<String>,
) -> ApiResult<Json<Value>> {
    let entry = state
        .registry
        .latest(&label)
        .ok_or_else(|| ApiError::not_found("not_found"))?;
    Ok(ok_with(json!({ "label": label }), entry))
}

pub async fn versions(State(state): State<AppState>, Path(label): Path<String>) -> Json<Value> {
    let versions = state.registry.versions(&label);
    Json(json!({ "ok": true, "label": label, "versions": versions }))
}

pub async fn version(
    State(state): State<AppState>,
    Path((label, version)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let entry = state
        .registry
        .version(&label, &version)
        .ok_or_else(|| ApiError::not_found("not_found"))?;
    Ok(ok_with(json!({ "label": label }), entry))
}

#[derive(Debug, Default, Deserialize)]
pub struct DiffBody {
    #[serde(default)]
    left: SchemaRef,
    #[serde(default)]
    right: SchemaRef,
}

fn cleaned(r: SchemaRef) -> SchemaRef {
    SchemaRef {
        label: present(r.label),
        version: present(r.version),
        raw_schema: present(r.raw_schema),
    }
}

pub async fn diff(
    State(state): State<AppState>,
    JsonBody(b): JsonBody<DiffBody>,
) -> ApiResult<Json<Value>> {
    let (left, right, diff) = state
        .registry
        .diff_refs(&cleaned(b.left), &cleaned(b.right))
        .ok_or_else(|| ApiError::validation("left_and_right_schema_required"))?;
    Ok(Json(json!({
        "ok": true,
        "left": { "schema": left },
        "right": { "schema": right },
        "diff": diff,
    })))
}

pub async fn encode(
    State(state): State<AppState>,
    JsonBody(b): JsonBody<EncodeRequest>,
) -> ApiResult<Json<Value>> {
    let encoded = state.pipeline.encode(b).await?;
    Ok(ok_with(json!({}), encoded))
}
