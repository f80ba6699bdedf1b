//! # Configuration
//!
//! Recognized mount options, loadable from Hadoop-style `key = value`
//! properties or from a TOML document.
//!
//! ## Property Keys
//!
//! | Key | Field | Default |
//! |-----|-------|---------|
//! | `ceph.root.dir` | `root_dir` | cluster root |
//! | `ceph.replication` | `replication` | 3 |
//! | `ceph.data.pools` | `data_pools` | none |
//! | `ceph.auth.id` | `auth_id` | none |
//! | `ceph.auth.keyfile` | `auth_keyfile` | none |
//! | `ceph.auth.keyring` | `auth_keyring` | none |
//! | `ceph.mon.address` | `mon_address` | none |
//! | `ceph.conf.file` | `conf_file` | none |
//! | `ceph.conf.options` | `conf_options` | none |
//! | `ceph.localize.reads` | `localize_reads` | true |
//! | `ceph.object.size` | `object_size` | 64 MiB |
//!
//! ## TOML
//!
//! ```rust
//! use cephfs_adapter::MountConfig;
//!
//! let config = MountConfig::from_toml_str(r#"
//!     replication = 2
//!     data_pools = ["fast", "archive"]
//!
//!     [conf_options]
//!     client_mount_timeout = "30"
//! "#).unwrap();
//! assert_eq!(config.replication, 2);
//! assert_eq!(config.data_pools, vec!["fast", "archive"]);
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::FsError;

/// Default object size and block size: 64 MiB.
pub const DEFAULT_OBJECT_SIZE: u64 = 64 * 1024 * 1024;

/// Default replication factor.
pub const DEFAULT_REPLICATION: u32 = 3;

/// Property keys understood by [`MountConfig::from_properties`] and
/// [`GatewayConfig::from_properties`].
pub mod keys {
    /// Object size, also the default block size.
    pub const OBJECT_SIZE: &str = "ceph.object.size";
    /// Cluster configuration file to load.
    pub const CONF_FILE: &str = "ceph.conf.file";
    /// Raw backend options, `key=value` pairs separated by commas.
    pub const CONF_OPTIONS: &str = "ceph.conf.options";
    /// Default replication factor.
    pub const REPLICATION: &str = "ceph.replication";
    /// Directory of the cluster namespace to mount as `/`.
    pub const ROOT_DIR: &str = "ceph.root.dir";
    /// Whether reads may be served by the nearest replica.
    pub const LOCALIZE_READS: &str = "ceph.localize.reads";
    /// Candidate data pools, comma separated.
    pub const DATA_POOLS: &str = "ceph.data.pools";
    /// Authentication identity.
    pub const AUTH_ID: &str = "ceph.auth.id";
    /// Authentication key file.
    pub const AUTH_KEYFILE: &str = "ceph.auth.keyfile";
    /// Authentication keyring.
    pub const AUTH_KEYRING: &str = "ceph.auth.keyring";
    /// Monitor address, `host:port`.
    pub const MON_ADDRESS: &str = "ceph.mon.address";

    /// Gateway client arguments.
    pub const RGW_ARGS: &str = "fs.ceph.rgw.args";
    /// Gateway block size.
    pub const RGW_BLOCK_SIZE: &str = "fs.ceph.rgw.blocksize";
    /// Gateway replication factor.
    pub const RGW_REPLICATION: &str = "fs.ceph.replication";
    /// Gateway user id.
    pub const RGW_USER_ID: &str = "fs.ceph.rgw.userid";
    /// Gateway access key.
    pub const RGW_ACCESS_KEY: &str = "fs.ceph.rgw.access.key";
    /// Gateway secret key.
    pub const RGW_SECRET_KEY: &str = "fs.ceph.rgw.secret.key";
}

/// Options for mounting the cluster-native filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MountConfig {
    /// Directory of the cluster namespace mounted as `/`.
    pub root_dir: Option<PathBuf>,
    /// Default replication factor.
    pub replication: u32,
    /// Candidate data pools, in priority order.
    pub data_pools: Vec<String>,
    /// Authentication identity.
    pub auth_id: Option<String>,
    /// Authentication key file.
    pub auth_keyfile: Option<PathBuf>,
    /// Authentication keyring.
    pub auth_keyring: Option<PathBuf>,
    /// Monitor address, `host:port`.
    pub mon_address: Option<String>,
    /// Cluster configuration file to load.
    pub conf_file: Option<PathBuf>,
    /// Raw backend option overrides.
    pub conf_options: BTreeMap<String, String>,
    /// Whether reads may be served by the nearest replica.
    pub localize_reads: bool,
    /// Object size, also the default block size.
    pub object_size: u64,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            root_dir: None,
            replication: DEFAULT_REPLICATION,
            data_pools: Vec::new(),
            auth_id: None,
            auth_keyfile: None,
            auth_keyring: None,
            mon_address: None,
            conf_file: None,
            conf_options: BTreeMap::new(),
            localize_reads: true,
            object_size: DEFAULT_OBJECT_SIZE,
        }
    }
}

impl MountConfig {
    /// Parse a TOML document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidArgument`] on malformed TOML, unknown fields, or
    ///   values rejected by [`validate`](Self::validate)
    pub fn from_toml_str(contents: &str) -> Result<Self, FsError> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| FsError::invalid_argument(format!("mount config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    ///
    /// # Errors
    ///
    /// - [`FsError::Io`] if the file cannot be read
    /// - Every error of [`from_toml_str`](Self::from_toml_str)
    pub fn from_toml_file(path: &Path) -> Result<Self, FsError> {
        let contents = std::fs::read_to_string(path).map_err(|source| FsError::Io {
            operation: "read config",
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Build from Hadoop-style properties. Keys this crate does not know are
    /// ignored, since such property sets usually carry unrelated settings.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidArgument`] on unparsable numbers or booleans,
    ///   malformed `ceph.conf.options`, or values rejected by
    ///   [`validate`](Self::validate)
    pub fn from_properties<I, K, V>(properties: I) -> Result<Self, FsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in properties {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                keys::ROOT_DIR => config.root_dir = Some(PathBuf::from(value)),
                keys::REPLICATION => config.replication = parse_number(key, value)?,
                keys::DATA_POOLS => config.data_pools = parse_data_pools(value),
                keys::AUTH_ID => config.auth_id = Some(value.to_string()),
                keys::AUTH_KEYFILE => config.auth_keyfile = Some(PathBuf::from(value)),
                keys::AUTH_KEYRING => config.auth_keyring = Some(PathBuf::from(value)),
                keys::MON_ADDRESS => config.mon_address = Some(value.to_string()),
                keys::CONF_FILE => config.conf_file = Some(PathBuf::from(value)),
                keys::CONF_OPTIONS => config.conf_options = parse_conf_options(value)?,
                keys::LOCALIZE_READS => config.localize_reads = parse_bool(key, value)?,
                keys::OBJECT_SIZE => config.object_size = parse_number(key, value)?,
                _ => debug!(key, "ignoring unrecognized property"),
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidArgument`] if `replication` or `object_size` is 0
    pub fn validate(&self) -> Result<(), FsError> {
        if self.replication == 0 {
            return Err(FsError::invalid_argument("replication must be at least 1"));
        }
        if self.object_size == 0 {
            return Err(FsError::invalid_argument("object size must be positive"));
        }
        Ok(())
    }
}

/// Options for mounting a bucket through the object gateway.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// Gateway client arguments.
    pub args: String,
    /// Gateway user id.
    pub user_id: Option<String>,
    /// Gateway access key.
    pub access_key: Option<String>,
    /// Gateway secret key.
    pub secret_key: Option<String>,
    /// Block size reported for files.
    pub block_size: u64,
    /// Replication factor reported for files.
    pub replication: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            args: "--name=client.admin".to_string(),
            user_id: None,
            access_key: None,
            secret_key: None,
            block_size: DEFAULT_OBJECT_SIZE,
            replication: DEFAULT_REPLICATION,
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("args", &self.args)
            .field("user_id", &self.user_id)
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("block_size", &self.block_size)
            .field("replication", &self.replication)
            .finish()
    }
}

impl GatewayConfig {
    /// Parse a TOML document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidArgument`] on malformed TOML or unknown fields
    pub fn from_toml_str(contents: &str) -> Result<Self, FsError> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| FsError::invalid_argument(format!("gateway config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Build from Hadoop-style properties.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidArgument`] on unparsable numbers
    pub fn from_properties<I, K, V>(properties: I) -> Result<Self, FsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in properties {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                keys::RGW_ARGS => config.args = value.to_string(),
                keys::RGW_USER_ID => config.user_id = Some(value.to_string()),
                keys::RGW_ACCESS_KEY => config.access_key = Some(value.to_string()),
                keys::RGW_SECRET_KEY => config.secret_key = Some(value.to_string()),
                keys::RGW_BLOCK_SIZE => config.block_size = parse_number(key, value)?,
                keys::RGW_REPLICATION => config.replication = parse_number(key, value)?,
                _ => debug!(key, "ignoring unrecognized property"),
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidArgument`] if `replication` or `block_size` is 0
    pub fn validate(&self) -> Result<(), FsError> {
        if self.replication == 0 {
            return Err(FsError::invalid_argument("replication must be at least 1"));
        }
        if self.block_size == 0 {
            return Err(FsError::invalid_argument("block size must be positive"));
        }
        Ok(())
    }
}

/// Split a comma-separated pool list. Blank entries are dropped.
pub fn parse_data_pools(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `key=value,key=value` backend overrides.
///
/// # Errors
///
/// - [`FsError::InvalidArgument`] if an entry does not contain exactly one `=`
pub fn parse_conf_options(value: &str) -> Result<BTreeMap<String, String>, FsError> {
    let mut options = BTreeMap::new();
    for option in value.split(',').filter(|o| !o.trim().is_empty()) {
        let mut parts = option.split('=');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(val), None) if !key.trim().is_empty() => {
                options.insert(key.trim().to_string(), val.trim().to_string());
            }
            _ => {
                return Err(FsError::invalid_argument(format!(
                    "invalid backend option: {option}"
                )));
            }
        }
    }
    Ok(options)
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, FsError> {
    value
        .trim()
        .parse()
        .map_err(|_| FsError::invalid_argument(format!("{key}: not a number: {value}")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, FsError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(FsError::invalid_argument(format!(
            "{key}: not a boolean: {value}"
        ))),
    }
}
