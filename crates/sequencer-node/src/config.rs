use sequencer_core::Address;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level node configuration, loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    pub tracks: TracksConfig,
    pub junction: JunctionConfig,
    pub consensus: ConsensusConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Station identifier, threaded through settlement-chain requests.
    pub station_id: String,

    /// Working directory for local state (unused by the in-memory
    /// reference lifecycle, reserved for a persistent one).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

/// The ordered set of tracks (validator/sequencer nodes) and this node's
/// position within it, hex-encoded with a `0x` prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracksConfig {
    pub addresses: Vec<String>,
    pub my_index: usize,
}

impl TracksConfig {
    pub fn resolve(&self) -> anyhow::Result<(Vec<Address>, Address)> {
        let parsed = self
            .addresses
            .iter()
            .map(|s| parse_address(s))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let me = *parsed
            .get(self.my_index)
            .ok_or_else(|| anyhow::anyhow!("tracks.my_index {} is out of bounds", self.my_index))?;
        Ok((parsed, me))
    }
}

fn parse_address(s: &str) -> anyhow::Result<Address> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(stripped).map_err(|e| anyhow::anyhow!("invalid track address '{s}': {e}"))?;
    Address::from_slice(&bytes).ok_or_else(|| anyhow::anyhow!("track address '{s}' is not 20 bytes"))
}

/// Settlement-chain client configuration (spec §6's `Config` fields —
/// the real RPC-backed `JunctionClient` is out of scope; this is kept
/// as the shape the real client would be configured with).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JunctionConfig {
    pub account_path: PathBuf,
    pub account_name: String,
    pub address_prefix: String,
    pub json_rpc: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Height-alignment poll interval, in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node: NodeConfig {
                station_id: "station-0".to_string(),
                data_dir: default_data_dir(),
            },
            tracks: TracksConfig {
                addresses: vec![format!("0x{}", "11".repeat(20))],
                my_index: 0,
            },
            junction: JunctionConfig {
                account_path: PathBuf::from("./account.json"),
                account_name: "sequencer".to_string(),
                address_prefix: "airchains".to_string(),
                json_rpc: "http://localhost:26657".to_string(),
            },
            consensus: ConsensusConfig {
                poll_interval_secs: default_poll_interval_secs(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tracks.addresses.is_empty() {
            anyhow::bail!("tracks.addresses must not be empty");
        }
        self.tracks.resolve()?;

        if self.consensus.poll_interval_secs == 0 {
            anyhow::bail!("consensus.poll_interval_secs must be greater than 0");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!("invalid log level: {}", self.logging.level);
        }

        if self.node.station_id.is_empty() {
            anyhow::bail!("node.station_id must not be empty");
        }

        Ok(())
    }
}
