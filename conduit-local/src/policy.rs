//! `ProviderRuntimePolicy`: feature flags and per-feature model allowlists
//! for local-inference backends (`spec.md §4.11`).

use serde::{Deserialize, Serialize};

/// A single runtime feature's policy: whether it is enabled at all, and
/// which model ids it applies to.
///
/// An empty `allowlist` means "no restriction" — the feature, if enabled,
/// applies to every model. A non-empty `allowlist` restricts it to the
/// listed model ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturePolicy {
    /// Whether the feature is enabled at all.
    pub enabled: bool,
    /// Model ids the feature is restricted to, or empty for "all models".
    #[serde(default)]
    pub allowlist: Vec<String>,
}

impl FeaturePolicy {
    /// An enabled feature with no model restriction.
    #[must_use]
    pub fn enabled_for_all() -> Self {
        Self {
            enabled: true,
            allowlist: Vec::new(),
        }
    }

    /// Whether this feature applies to `model_id`.
    ///
    /// A disabled flag disables the feature globally regardless of the
    /// allowlist. An empty allowlist permits every model.
    #[must_use]
    pub fn applies_to(&self, model_id: &str) -> bool {
        self.enabled && (self.allowlist.is_empty() || self.allowlist.iter().any(|m| m == model_id))
    }
}

/// The complete set of local-inference runtime features a provider may
/// toggle, each with its own [`FeaturePolicy`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRuntimePolicy {
    /// Key/value cache quantization.
    #[serde(default)]
    pub kv_quantization: FeaturePolicy,
    /// Attention-sink retention for long-context streaming.
    #[serde(default)]
    pub attention_sinks: FeaturePolicy,
    /// Swapping cold KV-cache pages out of device memory.
    #[serde(default)]
    pub kv_swap: FeaturePolicy,
    /// Incremental (chunked) prompt prefill.
    #[serde(default)]
    pub incremental_prefill: FeaturePolicy,
    /// Speculative decoding/scheduling.
    #[serde(default)]
    pub speculative_scheduling: FeaturePolicy,
}

/// A partial override of a [`ProviderRuntimePolicy`]: every field is
/// optional, and `None` means "leave the base unchanged."
///
/// When present, an override's `allowlist` wholly replaces the base
/// field's allowlist rather than appending to it, per `spec.md §4.11`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRuntimePolicyOverride {
    /// Override for `kv_quantization`.
    #[serde(default)]
    pub kv_quantization: Option<FeaturePolicy>,
    /// Override for `attention_sinks`.
    #[serde(default)]
    pub attention_sinks: Option<FeaturePolicy>,
    /// Override for `kv_swap`.
    #[serde(default)]
    pub kv_swap: Option<FeaturePolicy>,
    /// Override for `incremental_prefill`.
    #[serde(default)]
    pub incremental_prefill: Option<FeaturePolicy>,
    /// Override for `speculative_scheduling`.
    #[serde(default)]
    pub speculative_scheduling: Option<FeaturePolicy>,
}

impl ProviderRuntimePolicy {
    /// Applies `override_` on top of `self`, returning the merged policy.
    ///
    /// Each `Some(v)` field in `override_` replaces the corresponding base
    /// field wholesale (including its allowlist); each `None` field leaves
    /// the base field untouched.
    #[must_use]
    pub fn merge(&self, override_: &ProviderRuntimePolicyOverride) -> Self {
        Self {
            kv_quantization: override_
                .kv_quantization
                .clone()
                .unwrap_or_else(|| self.kv_quantization.clone()),
            attention_sinks: override_
                .attention_sinks
                .clone()
                .unwrap_or_else(|| self.attention_sinks.clone()),
            kv_swap: override_
                .kv_swap
                .clone()
                .unwrap_or_else(|| self.kv_swap.clone()),
            incremental_prefill: override_
                .incremental_prefill
                .clone()
                .unwrap_or_else(|| self.incremental_prefill.clone()),
            speculative_scheduling: override_
                .speculative_scheduling
                .clone()
                .unwrap_or_else(|| self.speculative_scheduling.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_flag_disables_regardless_of_allowlist() {
        let policy = FeaturePolicy {
            enabled: false,
            allowlist: vec!["model-a".to_string()],
        };
        assert!(!policy.applies_to("model-a"));
    }

    #[test]
    fn empty_allowlist_means_no_restriction() {
        let policy = FeaturePolicy::enabled_for_all();
        assert!(policy.applies_to("anything"));
    }

    #[test]
    fn non_empty_allowlist_restricts_to_listed_models() {
        let policy = FeaturePolicy {
            enabled: true,
            allowlist: vec!["model-a".to_string()],
        };
        assert!(policy.applies_to("model-a"));
        assert!(!policy.applies_to("model-b"));
    }

    #[test]
    fn merge_none_fields_leave_base_unchanged() {
        let base = ProviderRuntimePolicy {
            kv_quantization: FeaturePolicy::enabled_for_all(),
            ..Default::default()
        };
        let merged = base.merge(&ProviderRuntimePolicyOverride::default());
        assert_eq!(merged, base);
    }

    #[test]
    fn merge_some_field_wholly_replaces_base_allowlist() {
        let base = ProviderRuntimePolicy {
            kv_swap: FeaturePolicy {
                enabled: true,
                allowlist: vec!["old-model".to_string()],
            },
            ..Default::default()
        };
        let override_ = ProviderRuntimePolicyOverride {
            kv_swap: Some(FeaturePolicy {
                enabled: true,
                allowlist: vec!["new-model".to_string()],
            }),
            ..Default::default()
        };
        let merged = base.merge(&override_);
        assert_eq!(merged.kv_swap.allowlist, vec!["new-model".to_string()]);
        assert!(!merged.kv_swap.allowlist.contains(&"old-model".to_string()));
    }

    #[test]
    fn serde_round_trip_preserves_defaults() {
        let policy = ProviderRuntimePolicy::default();
        let json = serde_json::to_string(&policy).unwrap();
        let restored: ProviderRuntimePolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(policy, restored);
    }
}
