use serde::{Deserialize, Serialize};

/// Outcome of an entitlement check. Serializes to the flat shape exposed
/// over HTTP by host applications:
/// `{allowed, limit, used, remaining, unlimited, feature_code, reason}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementResult {
    pub allowed: bool,
    pub limit: Option<i64>,
    pub used: i64,
    pub remaining: Option<i64>,
    pub unlimited: bool,
    pub feature_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// What the resolver caches per (workspace, feature).
///
/// The snapshot deliberately excludes the requested quantity: a single
/// cached snapshot answers `can()` for any quantity, so a q=5 denial can
/// never poison a later q=1 check. `allowed`/`remaining` are derived in
/// [`EntitlementSnapshot::to_result`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntitlementSnapshot {
    /// Feature code unknown, or the feature has been deactivated.
    MissingFeature { feature_code: String },
    /// Feature exists but no active package grants it and no boost covers it.
    NotGranted { feature_code: String },
    /// Boolean feature with a grant present. Usage is never consulted.
    BooleanAllow { feature_code: String },
    /// Unlimited feature type, or a grant/boost with no limit value.
    /// `used` is informational.
    Unlimited { feature_code: String, used: i64 },
    /// Numeric limit resolved from package grants plus boosts.
    Limited {
        feature_code: String,
        limit: i64,
        used: i64,
    },
}

impl EntitlementSnapshot {
    pub fn feature_code(&self) -> &str {
        match self {
            Self::MissingFeature { feature_code }
            | Self::NotGranted { feature_code }
            | Self::BooleanAllow { feature_code }
            | Self::Unlimited { feature_code, .. }
            | Self::Limited { feature_code, .. } => feature_code,
        }
    }

    /// Derive the caller-facing result for a concrete requested quantity.
    pub fn to_result(&self, quantity: i64) -> EntitlementResult {
        let quantity = quantity.max(1);
        match self {
            Self::MissingFeature { feature_code } => EntitlementResult {
                allowed: false,
                limit: None,
                used: 0,
                remaining: None,
                unlimited: false,
                feature_code: feature_code.clone(),
                reason: Some("Feature does not exist".to_string()),
            },
            Self::NotGranted { feature_code } => EntitlementResult {
                allowed: false,
                limit: None,
                used: 0,
                remaining: None,
                unlimited: false,
                feature_code: feature_code.clone(),
                reason: Some("Your plan does not include this feature".to_string()),
            },
            Self::BooleanAllow { feature_code } => EntitlementResult {
                allowed: true,
                limit: None,
                used: 0,
                remaining: None,
                unlimited: false,
                feature_code: feature_code.clone(),
                reason: None,
            },
            Self::Unlimited { feature_code, used } => EntitlementResult {
                allowed: true,
                limit: None,
                used: *used,
                remaining: None,
                unlimited: true,
                feature_code: feature_code.clone(),
                reason: None,
            },
            Self::Limited {
                feature_code,
                limit,
                used,
            } => {
                let allowed = used + quantity <= *limit;
                let remaining = (limit - used).max(0);
                EntitlementResult {
                    allowed,
                    limit: Some(*limit),
                    used: *used,
                    remaining: Some(remaining),
                    unlimited: false,
                    feature_code: feature_code.clone(),
                    reason: if allowed {
                        None
                    } else {
                        Some(format!(
                            "You have reached your limit for this feature ({} of {} used)",
                            used, limit
                        ))
                    },
                }
            }
        }
    }
}
