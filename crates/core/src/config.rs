//! Hierarchy configuration types and builder
//!
//! Configuration is supplied once at construction and validated there;
//! nothing about the tier layout changes at runtime.
//!
//! # TOML form
//!
//! ```toml
//! write_policy = "write-back"
//! promotion = "adjacent"
//! durable_timeout_ms = 250
//! write_back_max_pending = 128
//!
//! [[tiers]]
//! capacity = 100
//! ttl_ms = 60000
//!
//! [[tiers]]
//! capacity = 1000
//! eviction = "lfu"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};
use crate::policy::EvictionKind;

/// When writes reach the durable store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WritePolicy {
    /// Every `put`/`remove` reaches the durable store before returning
    #[default]
    WriteThrough,
    /// Durable writes are buffered until [`flush`](crate::CacheHierarchy::flush).
    ///
    /// Buffered writes are lost if the process terminates before a flush.
    WriteBack,
}

impl std::str::FromStr for WritePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "write-through" => Ok(Self::WriteThrough),
            "write-back" => Ok(Self::WriteBack),
            other => Err(format!("unknown write policy '{other}'")),
        }
    }
}

/// Which faster tiers receive a value after a hit further down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromotionPolicy {
    /// A hit in tier *i* is copied into every tier above it; a durable hit
    /// fills every tier
    #[default]
    AllTiers,
    /// A hit in tier *i* is copied into tier *i-1* only; a durable hit
    /// fills the slowest tier only
    Adjacent,
}

impl std::str::FromStr for PromotionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "all-tiers" => Ok(Self::AllTiers),
            "adjacent" => Ok(Self::Adjacent),
            other => Err(format!("unknown promotion policy '{other}'")),
        }
    }
}

/// Configuration for one in-memory tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfig {
    /// Maximum number of entries
    pub capacity: usize,

    /// Eviction strategy
    #[serde(default)]
    pub eviction: EvictionKind,

    /// Expire entries this long after they were written (None = never)
    #[serde(default, rename = "ttl_ms", with = "optional_duration_millis")]
    pub ttl: Option<Duration>,
}

impl TierConfig {
    /// LRU tier of `capacity` entries without expiry
    pub fn new(capacity: usize) -> Self {
        Self { capacity, eviction: EvictionKind::Lru, ttl: None }
    }

    /// Set the eviction strategy
    #[must_use]
    pub fn eviction(mut self, eviction: EvictionKind) -> Self {
        self.eviction = eviction;
        self
    }

    /// Set the expire-after-write duration
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Configuration for a [`CacheHierarchy`](crate::CacheHierarchy)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyConfig {
    /// In-memory tiers, fastest first
    pub tiers: Vec<TierConfig>,

    /// Durable write policy
    #[serde(default)]
    pub write_policy: WritePolicy,

    /// Promotion behaviour after a hit below tier 0
    #[serde(default)]
    pub promotion: PromotionPolicy,

    /// Deadline for each durable store call (None = wait indefinitely)
    #[serde(default, rename = "durable_timeout_ms", with = "optional_duration_millis")]
    pub durable_timeout: Option<Duration>,

    /// Flush automatically once this many write-back entries are pending
    #[serde(default)]
    pub write_back_max_pending: Option<usize>,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            tiers: vec![TierConfig::new(1024)],
            write_policy: WritePolicy::WriteThrough,
            promotion: PromotionPolicy::AllTiers,
            durable_timeout: None,
            write_back_max_pending: None,
        }
    }
}

impl HierarchyConfig {
    /// Create a new configuration builder
    pub fn builder() -> HierarchyConfigBuilder {
        HierarchyConfigBuilder::default()
    }

    /// LRU tiers with the given capacities, write-through, no deadline
    ///
    /// # Example
    /// ```
    /// use stratum_core::HierarchyConfig;
    ///
    /// let config = HierarchyConfig::with_capacities(&[2, 4]);
    /// assert_eq!(config.tiers.len(), 2);
    /// ```
    pub fn with_capacities(capacities: &[usize]) -> Self {
        Self {
            tiers: capacities.iter().copied().map(TierConfig::new).collect(),
            ..Self::default()
        }
    }

    /// Check every constraint, returning the first violation
    ///
    /// # Errors
    /// Returns `CacheError::Configuration` describing the invalid field.
    pub fn validate(&self) -> CacheResult<()> {
        if self.tiers.is_empty() {
            return Err(CacheError::config("at least one tier is required"));
        }

        for (index, tier) in self.tiers.iter().enumerate() {
            if tier.capacity == 0 {
                return Err(CacheError::config(format!(
                    "tier {index}: capacity must be greater than zero"
                )));
            }
            if tier.ttl == Some(Duration::ZERO) {
                return Err(CacheError::config(format!(
                    "tier {index}: ttl must be greater than zero"
                )));
            }
        }

        self.validate_options()
    }

    /// Check the options that do not describe tiers
    pub(crate) fn validate_options(&self) -> CacheResult<()> {
        if self.durable_timeout == Some(Duration::ZERO) {
            return Err(CacheError::config("durable timeout must be greater than zero"));
        }

        if self.write_back_max_pending == Some(0) {
            return Err(CacheError::config("write_back_max_pending must be greater than zero"));
        }

        Ok(())
    }

    /// Capacities of every tier, fastest first
    pub fn capacities(&self) -> Vec<usize> {
        self.tiers.iter().map(|t| t.capacity).collect()
    }
}

/// Builder for HierarchyConfig with fluent API
#[derive(Debug, Default)]
pub struct HierarchyConfigBuilder {
    tiers: Vec<TierConfig>,
    write_policy: WritePolicy,
    promotion: PromotionPolicy,
    durable_timeout: Option<Duration>,
    write_back_max_pending: Option<usize>,
}

impl HierarchyConfigBuilder {
    /// Create a new builder with no tiers
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tier below the ones already added
    pub fn tier(mut self, tier: TierConfig) -> Self {
        self.tiers.push(tier);
        self
    }

    /// Append an LRU tier of `capacity` entries
    pub fn lru_tier(self, capacity: usize) -> Self {
        self.tier(TierConfig::new(capacity))
    }

    /// Set the durable write policy
    pub fn write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    /// Set the promotion policy
    pub fn promotion(mut self, promotion: PromotionPolicy) -> Self {
        self.promotion = promotion;
        self
    }

    /// Set the deadline applied to every durable store call
    pub fn durable_timeout(mut self, timeout: Duration) -> Self {
        self.durable_timeout = Some(timeout);
        self
    }

    /// Flush write-back entries automatically at this many pending writes
    pub fn write_back_max_pending(mut self, max: usize) -> Self {
        self.write_back_max_pending = Some(max);
        self
    }

    /// Build the configuration (validation happens at hierarchy construction)
    pub fn build(self) -> HierarchyConfig {
        HierarchyConfig {
            tiers: self.tiers,
            write_policy: self.write_policy,
            promotion: self.promotion,
            durable_timeout: self.durable_timeout,
            write_back_max_pending: self.write_back_max_pending,
        }
    }
}

/// Serialize an optional Duration as optional milliseconds (u64)
mod optional_duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
