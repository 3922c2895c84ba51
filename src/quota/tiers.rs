use std::collections::BTreeMap;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Sentinel used in tier files for "no monthly cap".
pub const UNLIMITED_SENTINEL: i64 = -1;

/// Monthly generation allowance of a subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum MonthlyLimit {
    Limited(u32),
    Unlimited,
}

impl MonthlyLimit {
    /// True when one more plan fits next to `used` existing plans.
    pub fn allows(self, used: i64) -> bool {
        match self {
            MonthlyLimit::Unlimited => true,
            MonthlyLimit::Limited(limit) => used < i64::from(limit),
        }
    }

    pub fn as_option(self) -> Option<u32> {
        match self {
            MonthlyLimit::Limited(limit) => Some(limit),
            MonthlyLimit::Unlimited => None,
        }
    }
}

impl TryFrom<i64> for MonthlyLimit {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value == UNLIMITED_SENTINEL {
            return Ok(MonthlyLimit::Unlimited);
        }
        u32::try_from(value)
            .map(MonthlyLimit::Limited)
            .map_err(|_| format!("monthly limit must be >= 0 or {UNLIMITED_SENTINEL}, got {value}"))
    }
}

impl From<MonthlyLimit> for i64 {
    fn from(limit: MonthlyLimit) -> Self {
        match limit {
            MonthlyLimit::Limited(n) => i64::from(n),
            MonthlyLimit::Unlimited => UNLIMITED_SENTINEL,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierLimits {
    pub monthly_limit: MonthlyLimit,
}

/// A tier name resolved against the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanTier {
    pub name: String,
    pub monthly_limit: MonthlyLimit,
}

/// Versioned tier table, keyed by tier name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierConfig {
    pub version: u32,
    pub default_tier: String,
    pub tiers: BTreeMap<String, TierLimits>,
}

impl Default for TierConfig {
    fn default() -> Self {
        let tiers = [
            ("free", MonthlyLimit::Limited(1)),
            ("starter", MonthlyLimit::Limited(3)),
            ("professional", MonthlyLimit::Unlimited),
            ("enterprise", MonthlyLimit::Unlimited),
        ]
        .into_iter()
        .map(|(name, monthly_limit)| (name.to_string(), TierLimits { monthly_limit }))
        .collect();

        Self {
            version: 1,
            default_tier: "free".into(),
            tiers,
        }
    }
}

impl TierConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read tier config {path}"))?;
        Self::from_json(&raw).with_context(|| format!("parse tier config {path}"))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let cfg: TierConfig = serde_json::from_str(raw)?;
        anyhow::ensure!(
            cfg.tiers.contains_key(&cfg.default_tier),
            "default tier {:?} is not defined",
            cfg.default_tier
        );
        Ok(cfg)
    }

    /// Resolves a subscription's tier name; absent or unknown names fall back
    /// to the default tier.
    pub fn resolve(&self, tier_name: Option<&str>) -> PlanTier {
        let known = tier_name.and_then(|name| self.tiers.get_key_value(name));
        let (name, limits) = match known {
            Some(entry) => entry,
            None => match self.tiers.get_key_value(&self.default_tier) {
                Some(entry) => entry,
                // from_json rejects this; a hand-built config may not.
                None => {
                    return PlanTier {
                        name: self.default_tier.clone(),
                        monthly_limit: MonthlyLimit::Limited(0),
                    }
                }
            },
        };
        PlanTier {
            name: name.clone(),
            monthly_limit: limits.monthly_limit,
        }
    }
}
