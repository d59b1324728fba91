//! Per-subscription filter policy.

use std::collections::HashSet;

use serde::Deserialize;
use streamgate_registry::SchemaRegistry;

/// Filter options as requested by a subscriber.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRequest {
    #[serde(default)]
    pub exclude_deprecated: bool,
    #[serde(default)]
    pub latest_only: bool,
    /// Labels whose latest ids `latest_only` admits; empty means all labels.
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Outcome of evaluating one event against a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Deliver,
    Deprecated,
    NotLatest,
}

/// Immutable filter attached to a subscription for its whole lifetime.
///
/// With `latest_only`, the admitted ids are pinned when the policy is built;
/// later promotions do not change an open subscription.
#[derive(Debug, Clone, Default)]
pub struct FilterPolicy {
    exclude_deprecated: bool,
    /// Lower-cased latest ids, present only for `latest_only` policies.
    latest_ids: Option<HashSet<String>>,
    labels: Vec<String>,
}

impl FilterPolicy {
    /// A policy that admits every event.
    pub fn pass_all() -> Self {
        Self::default()
    }

    /// Build a policy, snapshotting latest ids from `registry` if needed.
    pub fn snapshot(request: FilterRequest, registry: &SchemaRegistry) -> Self {
        let latest_ids = request
            .latest_only
            .then(|| registry.latest_ids(&request.labels));
        Self {
            exclude_deprecated: request.exclude_deprecated,
            latest_ids,
            labels: request.labels,
        }
    }

    /// Build a policy from an explicit latest-id set.
    pub fn with_latest_ids(
        exclude_deprecated: bool,
        latest_ids: Option<impl IntoIterator<Item = impl AsRef<str>>>,
    ) -> Self {
        Self {
            exclude_deprecated,
            latest_ids: latest_ids.map(|ids| {
                ids.into_iter()
                    .map(|id| id.as_ref().to_ascii_lowercase())
                    .collect()
            }),
            labels: Vec::new(),
        }
    }

    pub fn excludes_deprecated(&self) -> bool {
        self.exclude_deprecated
    }

    pub fn is_latest_only(&self) -> bool {
        self.latest_ids.is_some()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Decide whether an event carrying `schema_id` reaches clients.
    ///
    /// Events without a schema id always pass. `is_deprecated` is consulted
    /// only when the policy excludes deprecated versions.
    pub fn evaluate(&self, schema_id: Option<&str>, is_deprecated: impl FnOnce(&str) -> bool) -> Verdict {
        let Some(id) = schema_id else {
            return Verdict::Deliver;
        };
        if self.exclude_deprecated && is_deprecated(id) {
            return Verdict::Deprecated;
        }
        if let Some(latest) = &self.latest_ids {
            if !latest.contains(&id.to_ascii_lowercase()) {
                return Verdict::NotLatest;
            }
        }
        Verdict::Deliver
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn never(_: &str) -> bool {
        false
    }

    #[test]
    fn events_without_schema_id_always_pass() {
        let policy = FilterPolicy::with_latest_ids(true, Some(Vec::<String>::new()));
        assert_eq!(policy.evaluate(None, |_| true), Verdict::Deliver);
    }

    #[test]
    fn latest_only_compares_case_insensitively() {
        let policy = FilterPolicy::with_latest_ids(false, Some(["0xAbC"]));
        assert_eq!(policy.evaluate(Some("0xabc"), never), Verdict::Deliver);
        assert_eq!(policy.evaluate(Some("0XABC"), never), Verdict::Deliver);
        assert_eq!(policy.evaluate(Some("0xdef"), never), Verdict::NotLatest);
    }

    #[test]
    fn deprecation_checked_first_and_only_when_requested() {
        let policy = FilterPolicy::with_latest_ids(true, Some(["0x1"]));
        assert_eq!(policy.evaluate(Some("0x1"), |_| true), Verdict::Deprecated);

        let lenient = FilterPolicy::pass_all();
        assert_eq!(
            lenient.evaluate(Some("0x1"), |_| panic!("lookup not needed")),
            Verdict::Deliver
        );
    }

    #[test]
    fn request_defaults() {
        let req: FilterRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req, FilterRequest::default());
        let req: FilterRequest =
            serde_json::from_str(r#"{"latestOnly":true,"labels":["temp"]}"#).unwrap();
        assert!(req.latest_only && !req.exclude_deprecated);
        assert_eq!(req.labels, vec!["temp"]);
    }
}
