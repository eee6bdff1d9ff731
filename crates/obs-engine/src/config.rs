//! Layered startup configuration (spec §4.11): a TOML file, overridable
//! by environment variables, parsed once into the plain typed tables
//! `ObservationEngine::new` consumes. Mirrors the split the teacher
//! lineage draws between the process that owns config files and env
//! vars and the engine that only consumes already-parsed values: this
//! module is loaded by the (not-yet-written) server binary, never by
//! the core crates.

use std::{env, fs};

use obs_merge::UnitTable;
use obs_ranker::RankTable;
use obs_types::{FacetRankKey, ObsError};
use serde::Deserialize;

const ENV_BRANCH_TABLE: &str = "OBS_GATEWAY_BRANCH_TABLE";
const ENV_SLOW_QUERY_MS: &str = "OBS_GATEWAY_SLOW_QUERY_MS";

/// One `RankTable` entry as written in the TOML config.
#[derive(Debug, Clone, Deserialize)]
pub struct RankEntryConfig {
    pub import_name: String,
    #[serde(default)]
    pub measurement_method: Option<String>,
    #[serde(default)]
    pub observation_period: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    pub score: i32,
}

/// One unit-conversion entry, as consumed by `obs_merge::UnitTable`.
#[derive(Debug, Clone, Deserialize)]
pub struct UnitEntryConfig {
    pub source_unit: String,
    pub canonical_unit: String,
    pub factor: f64,
}

/// Declares one cache table in the store-group topology: its name and
/// priority, and whether it is the branch table. The config layer only
/// describes the topology; the server binary resolves each `name` to an
/// actual `CacheTable` backend connection (something a plain config value
/// can't represent) and builds the `StoreGroup` from that, in this order.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheTableConfig {
    pub name: String,
    #[serde(default)]
    pub priority: u32,
    #[serde(default)]
    pub is_branch: bool,
}

/// The on-disk shape of the gateway's layered configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub rank: Vec<RankEntryConfig>,
    #[serde(default)]
    pub units: Vec<UnitEntryConfig>,
    #[serde(default)]
    pub cache_tables: Vec<CacheTableConfig>,
    #[serde(default = "default_slow_query_ms")]
    pub slow_query_ms: u64,
}

fn default_slow_query_ms() -> u64 {
    500
}

impl GatewayConfig {
    /// Parses a TOML document, then applies the small set of
    /// environment-variable overrides the gateway recognizes (spec
    /// §4.11: "a TOML file overridable by environment variables").
    pub fn from_toml_str(raw: &str) -> Result<Self, ObsError> {
        let mut config: GatewayConfig =
            toml::from_str(raw).map_err(|e| ObsError::invalid_argument(format!("invalid config: {e}")))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Reads and parses the config file at `path`, applying environment
    /// overrides. The core never calls this; it is the server binary's
    /// entry point.
    pub fn load(path: &std::path::Path) -> Result<Self, ObsError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ObsError::invalid_argument(format!("cannot read config file {path:?}: {e}")))?;
        Self::from_toml_str(&raw)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(branch) = env::var(ENV_BRANCH_TABLE) {
            for table in &mut self.cache_tables {
                table.is_branch = table.name == branch;
            }
        }
        if let Ok(raw) = env::var(ENV_SLOW_QUERY_MS) {
            if let Ok(parsed) = raw.parse() {
                self.slow_query_ms = parsed;
            }
        }
    }

    /// Builds the process-global `RankTable` from the parsed entries.
    pub fn rank_table(&self) -> RankTable {
        RankTable::from_entries(self.rank.iter().map(|entry| {
            (
                entry.import_name.clone(),
                FacetRankKey {
                    measurement_method: entry.measurement_method.clone(),
                    observation_period: entry.observation_period.clone(),
                    unit: entry.unit.clone(),
                },
                entry.score,
            )
        }))
    }

    /// Builds the process-global `UnitTable` from the parsed entries.
    pub fn units_table(&self) -> UnitTable {
        UnitTable::from_entries(
            self.units.iter().map(|entry| (entry.source_unit.clone(), entry.canonical_unit.clone(), entry.factor)),
        )
    }
}
