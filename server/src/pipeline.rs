//! Encode and publish: schema resolution, value encoding, record submission.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use streamgate_core::{
    bounded, is_hex_data, sanitize_for_transport, DataRecord, GatewayError, StreamsClient,
    ValueEncoder,
};
use streamgate_evm::random_record_id;
use streamgate_observability::GatewayMetrics;
use streamgate_registry::{build_encode_values, SchemaDescriptor, SchemaRef, SchemaRegistry};
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeRequest {
    pub label: Option<String>,
    pub version: Option<String>,
    pub schema: Option<String>,
    pub values: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Encoded {
    pub schema: String,
    pub schema_id: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub label: Option<String>,
    pub version: Option<String>,
    pub schema: Option<String>,
    pub schema_id: Option<String>,
    pub values: Option<Value>,
    pub data_id: Option<String>,
    /// Accepted for compatibility; records carry no parent id.
    pub parent_schema_id: Option<String>,
    #[serde(default)]
    pub allow_deprecated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Published {
    pub schema_id: String,
    pub data_id: String,
    pub result: Value,
}

/// Treats empty strings as absent.
fn present(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|s| !s.is_empty())
}

pub struct PublishPipeline {
    registry: Arc<SchemaRegistry>,
    remote: Arc<dyn StreamsClient>,
    encoder: Arc<dyn ValueEncoder>,
    metrics: GatewayMetrics,
    remote_timeout: Duration,
    has_wallet: bool,
}

impl PublishPipeline {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        remote: Arc<dyn StreamsClient>,
        encoder: Arc<dyn ValueEncoder>,
        metrics: GatewayMetrics,
        remote_timeout: Duration,
        has_wallet: bool,
    ) -> Self {
        Self {
            registry,
            remote,
            encoder,
            metrics,
            remote_timeout,
            has_wallet,
        }
    }

    pub fn has_wallet(&self) -> bool {
        self.has_wallet
    }

    fn encode_with(&self, raw_schema: &str, values: &Value) -> Result<String, GatewayError> {
        let descriptor = SchemaDescriptor::parse(raw_schema);
        let encode_values = build_encode_values(&descriptor, values)?;
        let data = self.encoder.encode(&encode_values)?;
        if !is_hex_data(&data) {
            return Err(GatewayError::EncodingFailure {
                reason: "encoder returned non-hex output".into(),
            });
        }
        Ok(data)
    }

    /// Encode `values` against the resolved schema without submitting.
    pub async fn encode(&self, req: EncodeRequest) -> Result<Encoded, GatewayError> {
        let raw = self
            .registry
            .resolve_effective_schema(present(&req.label), present(&req.version), present(&req.schema))
            .ok_or_else(|| GatewayError::Validation("schema_or_label_required".into()))?;
        let values = req
            .values
            .as_ref()
            .filter(|v| !v.is_null())
            .ok_or_else(|| GatewayError::Validation("values_required".into()))?;

        let data = self.encode_with(&raw, values)?;
        let schema_id = self.registry.compute_schema_id(&raw).await?;
        Ok(Encoded {
            schema: raw,
            schema_id,
            data,
        })
    }

    /// Encode and submit one record. Nothing in the registry is mutated.
    pub async fn publish(&self, req: PublishRequest) -> Result<Published, GatewayError> {
        if !self.has_wallet {
            return Err(GatewayError::WalletRequired);
        }

        let resolved = self.registry.resolve(&SchemaRef {
            label: present(&req.label).map(String::from),
            version: present(&req.version).map(String::from),
            raw_schema: present(&req.schema).map(String::from),
        });
        if resolved.is_deprecated_version() && !req.allow_deprecated {
            return Err(GatewayError::VersionDeprecated);
        }

        let explicit_id = present(&req.schema_id);
        if resolved.raw_schema.is_none() && explicit_id.is_none() {
            return Err(GatewayError::Validation(
                "schema_or_label_or_schemaId_required".into(),
            ));
        }
        let values = req
            .values
            .as_ref()
            .filter(|v| !v.is_null())
            .ok_or_else(|| GatewayError::Validation("values_required".into()))?;

        let raw = match resolved.raw_schema.clone() {
            Some(raw) => raw,
            None => explicit_id
                .and_then(|id| self.registry.schema_text(id))
                .ok_or_else(|| GatewayError::EncodingFailure {
                    reason: "no schema text known for the given schemaId".into(),
                })?,
        };
        let data = self.encode_with(&raw, values)?;

        let schema_id = match explicit_id.or(resolved.known_schema_id()) {
            Some(id) => id.to_string(),
            None => self.registry.compute_schema_id(&raw).await?,
        };
        let data_id = present(&req.data_id)
            .map(String::from)
            .unwrap_or_else(random_record_id);
        debug!(schema_id = %schema_id, data_id = %data_id, "submitting record");

        let record = DataRecord {
            id: data_id.clone(),
            schema_id: schema_id.clone(),
            data,
        };
        let result = bounded(self.remote_timeout, self.remote.submit_records(vec![record])).await?;
        self.metrics.record_published();
        info!(schema_id = %schema_id, data_id = %data_id, "record published");

        Ok(Published {
            schema_id,
            data_id,
            result: sanitize_for_transport(result),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use streamgate_core::{EncodeValue, RegistryError};
    use streamgate_evm::AbiEncoder;
    use streamgate_registry::MemoryStorage;
    use streamgate_stream::MemoryStreams;

    struct NonHexEncoder;

    impl ValueEncoder for NonHexEncoder {
        fn encode(&self, _: &[EncodeValue]) -> Result<String, RegistryError> {
            Ok("not-hex".into())
        }
    }

    async fn pipeline_with(
        streams: Arc<MemoryStreams>,
        encoder: Arc<dyn ValueEncoder>,
        has_wallet: bool,
    ) -> (PublishPipeline, Arc<SchemaRegistry>) {
        let registry = Arc::new(
            SchemaRegistry::open(
                Arc::new(MemoryStorage::new()),
                streams.clone(),
                Duration::from_secs(1),
            )
            .await
            .unwrap(),
        );
        let p = PublishPipeline::new(
            registry.clone(),
            streams,
            encoder,
            GatewayMetrics::new(),
            Duration::from_secs(1),
            has_wallet,
        );
        (p, registry)
    }

    async fn pipeline() -> (PublishPipeline, Arc<SchemaRegistry>) {
        pipeline_with(
            Arc::new(MemoryStreams::with_publisher("0xpub")),
            Arc::new(AbiEncoder::new()),
            true,
        )
        .await
    }

    fn publish_req(label: &str, version: Option<&str>, values: Value) -> PublishRequest {
        PublishRequest {
            label: Some(label.into()),
            version: version.map(String::from),
            values: Some(values),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn write_identity_is_checked_first() {
        let (p, _) = pipeline_with(
            Arc::new(MemoryStreams::new()),
            Arc::new(AbiEncoder::new()),
            false,
        )
        .await;
        let err = p.publish(PublishRequest::default()).await.unwrap_err();
        assert!(matches!(err, GatewayError::WalletRequired));
    }

    #[tokio::test]
    async fn deprecated_version_blocks_unless_allowed() {
        let (p, reg) = pipeline().await;
        let v1 = reg.register_version("temp", "1", "uint256 value", None, true).await.unwrap();
        reg.deprecate("temp", "1", true).await.unwrap();

        let err = p
            .publish(publish_req("temp", Some("1"), json!({ "value": 1 })))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::VersionDeprecated));

        let mut req = publish_req("temp", Some("1"), json!({ "value": 1 }));
        req.allow_deprecated = true;
        let out = p.publish(req).await.unwrap();
        assert_eq!(out.schema_id, v1.schema_id);
    }

    #[tokio::test]
    async fn schema_and_values_are_required() {
        let (p, _) = pipeline().await;
        let err = p
            .publish(publish_req("nobody", None, json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "schema_or_label_or_schemaId_required");

        let req = PublishRequest {
            schema: Some("uint8 a".into()),
            values: Some(Value::Null),
            ..Default::default()
        };
        assert_eq!(p.publish(req).await.unwrap_err().error_code(), "values_required");
    }

    #[tokio::test]
    async fn missing_named_field_fails_before_submission() {
        let (p, reg) = pipeline().await;
        reg.register_latest("temp", "uint256 value, string unit", None, true)
            .await
            .unwrap();
        let err = p
            .publish(publish_req("temp", None, json!({ "value": 3 })))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "values_missing_field_unit");
    }

    #[tokio::test]
    async fn non_hex_encoder_output_is_rejected() {
        let (p, _) = pipeline_with(
            Arc::new(MemoryStreams::with_publisher("0xpub")),
            Arc::new(NonHexEncoder),
            true,
        )
        .await;
        let req = EncodeRequest {
            schema: Some("uint8 a".into()),
            values: Some(json!([1])),
            ..Default::default()
        };
        let err = p.encode(req).await.unwrap_err();
        assert_eq!(err.error_code(), "encoding_failed_expected_hex");
    }

    #[tokio::test]
    async fn identifiers_follow_precedence() {
        let (p, reg) = pipeline().await;
        let latest = reg.register_latest("temp", "uint256 value", None, true).await.unwrap();

        let out = p
            .publish(publish_req("temp", None, json!({ "value": 7 })))
            .await
            .unwrap();
        assert_eq!(out.schema_id, latest.schema_id);
        assert!(out.data_id.starts_with("0x") && out.data_id.len() == 66);

        let mut req = publish_req("temp", None, json!([7]));
        req.schema_id = Some("0xexplicit".into());
        req.data_id = Some("0xrecord".into());
        let out = p.publish(req).await.unwrap();
        assert_eq!(out.schema_id, "0xexplicit");
        assert_eq!(out.data_id, "0xrecord");
    }

    #[tokio::test]
    async fn schema_id_alone_finds_registered_text() {
        let (p, reg) = pipeline().await;
        let v = reg.register_version("temp", "1", "bool ok", None, true).await.unwrap();
        let req = PublishRequest {
            schema_id: Some(v.schema_id.to_uppercase()),
            values: Some(json!({ "ok": true })),
            ..Default::default()
        };
        let out = p.publish(req).await.unwrap();
        assert_eq!(out.schema_id, v.schema_id.to_uppercase());
    }

    #[tokio::test]
    async fn encode_falls_back_to_latest_and_computes_id() {
        let (p, reg) = pipeline().await;
        reg.register_version("temp", "1", "uint8 a", None, true).await.unwrap();
        let out = p
            .encode(EncodeRequest {
                label: Some("temp".into()),
                version: Some("9".into()),
                values: Some(json!({ "a": 1 })),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(out.schema, "uint8 a");
        assert_eq!(out.schema_id, streamgate_evm::schema_id("uint8 a"));
        assert!(is_hex_data(&out.data));
    }
}
