//! Configuration loader
//!
//! Loads a [`HierarchyConfig`] from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `STRATUM_TIER_CAPACITIES` is unset or invalid, falls back to a file
//! 3. Probes multiple paths for config files
//! 4. Supports TOML and JSON formats
//!
//! Values are not validated here; `CacheHierarchy` construction does that.
//!
//! ## Environment Variables
//! - `STRATUM_TIER_CAPACITIES`: Comma-separated tier capacities, fastest
//!   first (required, e.g. `2,4`)
//! - `STRATUM_EVICTION`: Eviction policy for every tier (`lru`, `lfu`,
//!   `fifo`)
//! - `STRATUM_WRITE_POLICY`: `write-through` or `write-back`
//! - `STRATUM_PROMOTION`: `all-tiers` or `adjacent`
//! - `STRATUM_DURABLE_TIMEOUT_MS`: Deadline for each durable store call
//! - `STRATUM_WRITE_BACK_MAX_PENDING`: Auto-flush threshold
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./stratum.toml` or `./stratum.json` (current working directory)
//! 2. `../stratum.toml` or `../stratum.json` (parent directory)
//! 3. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use stratum_core::{
    CacheError, CacheResult, EvictionKind, HierarchyConfig, PromotionPolicy, TierConfig,
    WritePolicy,
};

const CAPACITIES_VAR: &str = "STRATUM_TIER_CAPACITIES";
const EVICTION_VAR: &str = "STRATUM_EVICTION";
const WRITE_POLICY_VAR: &str = "STRATUM_WRITE_POLICY";
const PROMOTION_VAR: &str = "STRATUM_PROMOTION";
const TIMEOUT_VAR: &str = "STRATUM_DURABLE_TIMEOUT_MS";
const MAX_PENDING_VAR: &str = "STRATUM_WRITE_BACK_MAX_PENDING";

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If that fails,
/// falls back to loading from a probed config file.
///
/// # Errors
/// Returns `CacheError::Configuration` if neither source yields a
/// configuration.
pub fn load() -> CacheResult<HierarchyConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Cache configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only `STRATUM_TIER_CAPACITIES` is required; every other option keeps
/// its default when unset.
///
/// # Errors
/// Returns `CacheError::Configuration` if the capacities are missing or
/// any variable holds an invalid value.
pub fn load_from_env() -> CacheResult<HierarchyConfig> {
    let capacities = parse_capacities(&env_var(CAPACITIES_VAR)?)?;
    let eviction = env_parsed::<EvictionKind>(EVICTION_VAR)?.unwrap_or_default();

    let mut config = HierarchyConfig {
        tiers: capacities.into_iter().map(|c| TierConfig::new(c).eviction(eviction)).collect(),
        ..HierarchyConfig::default()
    };

    if let Some(policy) = env_parsed::<WritePolicy>(WRITE_POLICY_VAR)? {
        config.write_policy = policy;
    }
    if let Some(promotion) = env_parsed::<PromotionPolicy>(PROMOTION_VAR)? {
        config.promotion = promotion;
    }
    config.durable_timeout = env_parsed::<u64>(TIMEOUT_VAR)?.map(Duration::from_millis);
    config.write_back_max_pending = env_parsed::<usize>(MAX_PENDING_VAR)?;

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// The format is detected by file extension (`.toml` or `.json`).
///
/// # Errors
/// Returns `CacheError::Configuration` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> CacheResult<HierarchyConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CacheError::config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CacheError::config("No config file found in any of the standard locations")
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading cache configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CacheError::config(format!("Failed to read config file: {e}")))?;

    parse_for_path(&contents, &config_path)
}

/// Parse a TOML configuration document
///
/// # Errors
/// Returns `CacheError::Configuration` if the document is not valid TOML
/// or does not describe a `HierarchyConfig`.
pub fn parse_config(contents: &str) -> CacheResult<HierarchyConfig> {
    toml::from_str(contents).map_err(|e| CacheError::config(format!("Invalid TOML format: {e}")))
}

/// Parse configuration, choosing the format from the file extension
fn parse_for_path(contents: &str, path: &Path) -> CacheResult<HierarchyConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => parse_config(contents),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CacheError::config(format!("Invalid JSON format: {e}"))),
        _ => Err(CacheError::config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
        candidates.extend(candidates_in(&cwd.join("..")));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> [PathBuf; 2] {
    [dir.join("stratum.toml"), dir.join("stratum.json")]
}

/// Parse `2,4,16` into tier capacities
fn parse_capacities(raw: &str) -> CacheResult<Vec<usize>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<usize>().map_err(|e| {
                CacheError::config(format!("Invalid tier capacity '{part}' in {CAPACITIES_VAR}: {e}"))
            })
        })
        .collect()
}

/// Get required environment variable
///
/// # Errors
/// Returns `CacheError::Configuration` if the variable is not set.
fn env_var(key: &str) -> CacheResult<String> {
    std::env::var(key)
        .map_err(|_| CacheError::config(format!("Missing required environment variable: {key}")))
}

/// Parse an optional environment variable, `Ok(None)` when unset
fn env_parsed<T>(key: &str) -> CacheResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| CacheError::config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for config::loader.
    use std::sync::Mutex;

    use once_cell::sync::Lazy;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ALL_VARS: [&str; 6] =
        [CAPACITIES_VAR, EVICTION_VAR, WRITE_POLICY_VAR, PROMOTION_VAR, TIMEOUT_VAR, MAX_PENDING_VAR];

    fn clear_env() {
        for var in ALL_VARS {
            std::env::remove_var(var);
        }
    }

    /// Validates capacity list parsing.
    #[test]
    fn test_parse_capacities() {
        assert_eq!(parse_capacities("2,4").unwrap(), vec![2, 4]);
        assert_eq!(parse_capacities(" 8 , 64 ,").unwrap(), vec![8, 64]);
        assert!(parse_capacities("2,four").is_err());
        assert!(parse_capacities("").unwrap().is_empty());
    }

    /// Validates loading every option from the environment.
    ///
    /// Assertions:
    /// - Confirms capacities and eviction apply to every tier.
    /// - Confirms policies, timeout and threshold are carried through.
    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var(CAPACITIES_VAR, "2,4");
        std::env::set_var(EVICTION_VAR, "lfu");
        std::env::set_var(WRITE_POLICY_VAR, "write-back");
        std::env::set_var(PROMOTION_VAR, "adjacent");
        std::env::set_var(TIMEOUT_VAR, "250");
        std::env::set_var(MAX_PENDING_VAR, "32");

        let result = load_from_env();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.capacities(), vec![2, 4]);
        assert!(config.tiers.iter().all(|t| t.eviction == EvictionKind::Lfu));
        assert_eq!(config.write_policy, WritePolicy::WriteBack);
        assert_eq!(config.promotion, PromotionPolicy::Adjacent);
        assert_eq!(config.durable_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.write_back_max_pending, Some(32));
    }

    /// Validates that only the capacities are required.
    #[test]
    fn test_load_from_env_defaults() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var(CAPACITIES_VAR, "16");

        let result = load_from_env();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.capacities(), vec![16]);
        assert_eq!(config.write_policy, WritePolicy::WriteThrough);
        assert!(config.durable_timeout.is_none());
    }

    /// Validates missing and invalid variables map to configuration errors.
    #[test]
    fn test_load_from_env_errors() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let missing = load_from_env().unwrap_err();
        assert!(matches!(missing, CacheError::Configuration(_)));
        assert!(missing.to_string().contains(CAPACITIES_VAR));

        std::env::set_var(CAPACITIES_VAR, "4");
        std::env::set_var(WRITE_POLICY_VAR, "sometimes");
        let invalid = load_from_env().unwrap_err();
        clear_env();

        assert!(matches!(invalid, CacheError::Configuration(_)));
        assert!(invalid.to_string().contains(WRITE_POLICY_VAR));
    }

    /// Validates TOML parsing and format detection.
    #[test]
    fn test_parse_for_path() {
        let toml = "[[tiers]]\ncapacity = 3\n";
        assert_eq!(parse_for_path(toml, Path::new("a.toml")).unwrap().capacities(), vec![3]);

        let json = r#"{"tiers":[{"capacity":5,"eviction":"fifo"}]}"#;
        let config = parse_for_path(json, Path::new("a.json")).unwrap();
        assert_eq!(config.tiers[0].eviction, EvictionKind::Fifo);

        assert!(parse_for_path(toml, Path::new("a.yaml")).is_err());
        assert!(parse_config("tiers = 3").is_err());
    }

    /// Validates an explicit missing path is reported.
    #[test]
    fn test_load_from_file_missing() {
        let err = load_from_file(Some(PathBuf::from("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
