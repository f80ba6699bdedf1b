//! Per-mount settings read by the façade.

use std::path::{Path, PathBuf};

use crate::config::{DEFAULT_OBJECT_SIZE, DEFAULT_REPLICATION};
use crate::{GatewayConfig, MountConfig, PathResolver, resolve_against};

/// Settings of one mounted filesystem.
///
/// Immutable once built; change the working directory through
/// [`CephFileSystem::with_working_directory`](crate::CephFileSystem::with_working_directory).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountContext {
    working_dir: PathBuf,
    home_dir: PathBuf,
    mount_root: PathBuf,
    default_replication: u32,
    data_pools: Vec<String>,
    localize_reads: bool,
    default_block_size: u64,
}

impl MountContext {
    /// Start building a context with default settings.
    pub fn builder() -> MountContextBuilder {
        MountContextBuilder::default()
    }

    /// Context for a cluster-native mount.
    ///
    /// The working directory starts at the home directory, `/user/<auth id>`
    /// when an identity is configured, `/` otherwise.
    pub fn from_config(config: &MountConfig) -> Self {
        let home = home_for(config.auth_id.as_deref());
        Self::builder()
            .working_dir(&home)
            .home_dir(home)
            .mount_root(config.root_dir.clone().unwrap_or_else(|| PathBuf::from("/")))
            .default_replication(config.replication)
            .data_pools(config.data_pools.clone())
            .localize_reads(config.localize_reads)
            .default_block_size(config.object_size)
            .build()
    }

    /// Context for a gateway mount. The bucket is the root.
    pub fn from_gateway_config(config: &GatewayConfig) -> Self {
        let home = home_for(config.user_id.as_deref());
        Self::builder()
            .working_dir(&home)
            .home_dir(home)
            .default_replication(config.replication)
            .default_block_size(config.block_size)
            .build()
    }

    /// Current working directory, always absolute.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Home directory of the mounting identity.
    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    /// Directory of the cluster namespace mounted as `/`.
    pub fn mount_root(&self) -> &Path {
        &self.mount_root
    }

    /// Replication factor used when a caller does not ask for one.
    pub fn default_replication(&self) -> u32 {
        self.default_replication
    }

    /// Candidate data pools, in configuration order.
    pub fn data_pools(&self) -> &[String] {
        &self.data_pools
    }

    /// Whether reads may be served by the nearest replica.
    pub fn localize_reads(&self) -> bool {
        self.localize_reads
    }

    /// Block size used when a caller does not ask for one.
    pub fn default_block_size(&self) -> u64 {
        self.default_block_size
    }

    /// Same settings with a different working directory. Relative
    /// directories resolve against the current one.
    pub fn with_working_dir(&self, dir: &Path) -> Self {
        Self {
            working_dir: self.resolve(dir),
            ..self.clone()
        }
    }
}

impl PathResolver for MountContext {
    fn resolve(&self, path: &Path) -> PathBuf {
        resolve_against(&self.working_dir, path)
    }
}

fn home_for(identity: Option<&str>) -> PathBuf {
    match identity {
        Some(id) if !id.is_empty() => Path::new("/user").join(id),
        _ => PathBuf::from("/"),
    }
}

/// Builder for [`MountContext`].
#[derive(Debug, Clone)]
pub struct MountContextBuilder {
    working_dir: PathBuf,
    home_dir: Option<PathBuf>,
    mount_root: PathBuf,
    default_replication: u32,
    data_pools: Vec<String>,
    localize_reads: bool,
    default_block_size: u64,
}

impl Default for MountContextBuilder {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("/"),
            home_dir: None,
            mount_root: PathBuf::from("/"),
            default_replication: DEFAULT_REPLICATION,
            data_pools: Vec::new(),
            localize_reads: true,
            default_block_size: DEFAULT_OBJECT_SIZE,
        }
    }
}

impl MountContextBuilder {
    /// Working directory. Relative values are anchored at `/`.
    pub fn working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = resolve_against(Path::new("/"), dir.as_ref());
        self
    }

    /// Home directory. Defaults to the working directory.
    pub fn home_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.home_dir = Some(resolve_against(Path::new("/"), dir.as_ref()));
        self
    }

    /// Directory of the cluster namespace mounted as `/`.
    pub fn mount_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.mount_root = dir.into();
        self
    }

    /// Default replication factor.
    pub fn default_replication(mut self, replication: u32) -> Self {
        self.default_replication = replication;
        self
    }

    /// Candidate data pools.
    pub fn data_pools(mut self, pools: Vec<String>) -> Self {
        self.data_pools = pools;
        self
    }

    /// Whether reads may be served by the nearest replica.
    pub fn localize_reads(mut self, localize: bool) -> Self {
        self.localize_reads = localize;
        self
    }

    /// Default block size.
    pub fn default_block_size(mut self, block_size: u64) -> Self {
        self.default_block_size = block_size;
        self
    }

    /// Finish building.
    pub fn build(self) -> MountContext {
        MountContext {
            home_dir: self.home_dir.unwrap_or_else(|| self.working_dir.clone()),
            working_dir: self.working_dir,
            mount_root: self.mount_root,
            default_replication: self.default_replication,
            data_pools: self.data_pools,
            localize_reads: self.localize_reads,
            default_block_size: self.default_block_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let ctx = MountContext::builder().build();
        assert_eq!(ctx.working_dir(), Path::new("/"));
        assert_eq!(ctx.home_dir(), Path::new("/"));
        assert_eq!(ctx.default_replication(), 3);
        assert_eq!(ctx.default_block_size(), 64 * 1024 * 1024);
        assert!(ctx.localize_reads());
    }

    #[test]
    fn from_config_uses_auth_id_for_home() {
        let config = MountConfig {
            auth_id: Some("hadoop".into()),
            replication: 2,
            data_pools: vec!["fast".into()],
            ..Default::default()
        };
        let ctx = MountContext::from_config(&config);
        assert_eq!(ctx.working_dir(), Path::new("/user/hadoop"));
        assert_eq!(ctx.home_dir(), Path::new("/user/hadoop"));
        assert_eq!(ctx.default_replication(), 2);
        assert_eq!(ctx.data_pools(), ["fast".to_string()]);
    }

    #[test]
    fn from_config_without_identity_starts_at_root() {
        let ctx = MountContext::from_config(&MountConfig::default());
        assert_eq!(ctx.working_dir(), Path::new("/"));
    }

    #[test]
    fn relative_working_dir_is_anchored() {
        let ctx = MountContext::builder().working_dir("data").build();
        assert_eq!(ctx.working_dir(), Path::new("/data"));
    }

    #[test]
    fn with_working_dir_resolves_relative() {
        let ctx = MountContext::builder().working_dir("/user/a").build();
        let moved = ctx.with_working_dir(Path::new("jobs"));
        assert_eq!(moved.working_dir(), Path::new("/user/a/jobs"));
        assert_eq!(moved.home_dir(), Path::new("/user/a"));
        assert_eq!(
            moved.resolve(Path::new("part-0")),
            PathBuf::from("/user/a/jobs/part-0")
        );
    }

    #[test]
    fn gateway_context_uses_gateway_settings() {
        let config = GatewayConfig {
            block_size: 4096,
            replication: 1,
            ..Default::default()
        };
        let ctx = MountContext::from_gateway_config(&config);
        assert_eq!(ctx.default_block_size(), 4096);
        assert_eq!(ctx.default_replication(), 1);
    }
}
