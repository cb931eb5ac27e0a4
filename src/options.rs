use crate::error::{ErrorKind, Result};
use derive_more::Display;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tierkv_cache::{EvictionListener, PolicyKind};
use tierkv_storage::Backend;

/// Items kept in memory by the [`memory`](HybridOptions::memory) and
/// [`hybrid`](HybridOptions::hybrid) presets.
pub const DEFAULT_MAX_MEMORY_ITEMS: usize = 2500;
/// Prefix of temporary disk tier directories.
pub const DEFAULT_TEMP_PREFIX: &str = "tierkv-";

/// Which tiers a [`HybridStore`](crate::HybridStore) uses.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash)]
pub enum Mode {
    #[display("memory")]
    Memory,
    #[display("disk")]
    Disk,
    #[default]
    #[display("hybrid")]
    Hybrid,
}

impl Mode {
    pub fn uses_memory(self) -> bool {
        matches!(self, Mode::Memory | Mode::Hybrid)
    }

    pub fn uses_disk(self) -> bool {
        matches!(self, Mode::Disk | Mode::Hybrid)
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Mode::Memory),
            "disk" => Ok(Mode::Disk),
            "hybrid" => Ok(Mode::Hybrid),
            other => Err(format!("unknown store mode: {other}")),
        }
    }
}

/// Construction options for a [`HybridStore`](crate::HybridStore).
///
/// Start from one of the presets and adjust with the `with_*` methods:
///
/// ```
/// use std::time::Duration;
/// use tierkv::{HybridOptions, Mode};
///
/// let options = HybridOptions::hybrid().with_max_memory_items(100).with_memory_expiration(Duration::from_secs(60));
/// assert_eq!(options.mode, Mode::Hybrid);
/// ```
#[derive(Clone)]
pub struct HybridOptions {
    pub mode: Mode,
    pub backend: Backend,
    /// Lifetime of memory tier entries. `None` means no expiry.
    pub memory_expiration: Option<Duration>,
    /// Lifetime of records written by disk mode `set`. Demoted entries
    /// never expire.
    pub disk_expiration: Option<Duration>,
    /// Period of the memory tier expiry sweep.
    pub sweep_interval: Option<Duration>,
    pub policy: PolicyKind,
    /// Disk tier directory. A temporary directory is allocated when unset.
    pub path: Option<PathBuf>,
    /// Remove an allocated disk tier directory on close, and garbage collect
    /// stale ones at startup.
    pub cleanup: bool,
    /// Memory tier capacity. Zero means unbounded.
    pub max_memory_items: usize,
    /// Notified of every entry leaving the memory tier, after any demotion.
    pub on_evicted: Option<Arc<dyn EvictionListener>>,
    /// Temporary directories older than this are removed at startup.
    pub remove_older_than: Option<Duration>,
    /// Demote expired memory entries to disk as well as capacity victims.
    /// On by default; when off, an expired entry is removed from disk too.
    pub move_to_disk_on_expiration: bool,
    /// Where temporary directories live. Defaults to the system temp dir.
    pub temp_root: Option<PathBuf>,
    pub temp_prefix: String,
}

impl HybridOptions {
    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            backend: Backend::default(),
            memory_expiration: None,
            disk_expiration: None,
            sweep_interval: None,
            policy: PolicyKind::default(),
            path: None,
            cleanup: false,
            max_memory_items: 0,
            on_evicted: None,
            remove_older_than: None,
            move_to_disk_on_expiration: true,
            temp_root: None,
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
        }
    }

    /// Memory only, keeping [`DEFAULT_MAX_MEMORY_ITEMS`].
    pub fn memory() -> Self {
        Self { max_memory_items: DEFAULT_MAX_MEMORY_ITEMS, ..Self::with_mode(Mode::Memory) }
    }

    /// Disk only on redb, cleaning up after itself and removing temporary
    /// directories left over for more than two days.
    pub fn disk() -> Self {
        Self {
            backend: Backend::Redb,
            cleanup: true,
            remove_older_than: Some(Duration::from_secs(48 * 60 * 60)),
            ..Self::with_mode(Mode::Disk)
        }
    }

    /// Both tiers, keeping [`DEFAULT_MAX_MEMORY_ITEMS`] in memory.
    pub fn hybrid() -> Self {
        Self { max_memory_items: DEFAULT_MAX_MEMORY_ITEMS, ..Self::with_mode(Mode::Hybrid) }
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_memory_expiration(mut self, ttl: Duration) -> Self {
        self.memory_expiration = Some(ttl);
        self
    }

    pub fn with_disk_expiration(mut self, ttl: Duration) -> Self {
        self.disk_expiration = Some(ttl);
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn with_max_memory_items(mut self, items: usize) -> Self {
        self.max_memory_items = items;
        self
    }

    pub fn with_on_evicted(mut self, listener: impl EvictionListener + 'static) -> Self {
        self.on_evicted = Some(Arc::new(listener));
        self
    }

    pub fn with_remove_older_than(mut self, age: Duration) -> Self {
        self.remove_older_than = Some(age);
        self
    }

    pub fn with_move_to_disk_on_expiration(mut self, enabled: bool) -> Self {
        self.move_to_disk_on_expiration = enabled;
        self
    }

    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    pub fn with_temp_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.temp_prefix = prefix.into();
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.mode.uses_disk() && self.path.is_none() && self.temp_prefix.is_empty() {
            exn::bail!(ErrorKind::InvalidConfig("temp prefix must not be empty".to_string()));
        }
        if self.sweep_interval.is_some_and(|interval| interval.is_zero()) {
            exn::bail!(ErrorKind::InvalidConfig("sweep interval must be positive".to_string()));
        }
        Ok(())
    }

    /// Whether startup should remove stale temporary directories.
    pub(crate) fn collects_garbage(&self) -> bool {
        self.cleanup && self.path.is_none() && self.remove_older_than.is_some_and(|age| !age.is_zero())
    }
}

impl Default for HybridOptions {
    fn default() -> Self {
        Self::hybrid()
    }
}

impl fmt::Debug for HybridOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridOptions")
            .field("mode", &self.mode)
            .field("backend", &self.backend)
            .field("memory_expiration", &self.memory_expiration)
            .field("disk_expiration", &self.disk_expiration)
            .field("sweep_interval", &self.sweep_interval)
            .field("policy", &self.policy)
            .field("path", &self.path)
            .field("cleanup", &self.cleanup)
            .field("max_memory_items", &self.max_memory_items)
            .field("on_evicted", &self.on_evicted.is_some())
            .field("remove_older_than", &self.remove_older_than)
            .field("move_to_disk_on_expiration", &self.move_to_disk_on_expiration)
            .field("temp_root", &self.temp_root)
            .field("temp_prefix", &self.temp_prefix)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn presets() {
        assert_eq!(HybridOptions::memory().max_memory_items, 2500);
        assert_eq!(HybridOptions::hybrid().mode, Mode::Hybrid);
        let disk = HybridOptions::disk();
        assert!(disk.cleanup);
        assert_eq!(disk.remove_older_than, Some(Duration::from_secs(172_800)));
        assert!(disk.collects_garbage());
        assert!(!disk.with_path("/tmp/x").collects_garbage());
    }

    #[rstest]
    #[case("memory", Mode::Memory)]
    #[case("DISK", Mode::Disk)]
    #[case("hybrid", Mode::Hybrid)]
    fn parse_mode(#[case] input: &str, #[case] expected: Mode) {
        assert_eq!(input.parse::<Mode>().unwrap(), expected);
    }

    #[test]
    fn empty_prefix_is_invalid() {
        let err = HybridOptions::disk().with_temp_prefix("").validate().unwrap_err();
        assert!(matches!(*err, ErrorKind::InvalidConfig(_)));
        assert!(HybridOptions::memory().with_temp_prefix("").validate().is_ok());
    }
}
