use crate::error::{ErrorKind, Result};
use crate::{ENV_PREFIX, ENV_SEPARATOR};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::instrument;

const FILE_STEM: &str = "tierkv";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cache: CacheSettings,
    pub hybrid: HybridSettings,
    pub filekv: FileKvSettings,
}

/// Standalone eviction cache settings. The hybrid store takes its policy
/// and sweep interval from here as well.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub capacity: usize,
    /// One of `lru`, `lfu`, `arc` or `unordered`.
    pub policy: String,
    /// Default entry lifetime, `0` for none.
    pub ttl_secs: u64,
    /// Background expiry sweep period, `0` to disable the sweeper.
    pub sweep_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { capacity: 1000, policy: "lru".to_string(), ttl_secs: 0, sweep_interval_secs: 0 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridSettings {
    /// One of `memory`, `disk` or `hybrid`.
    pub mode: String,
    /// One of `redb`, `directory` or `file`.
    pub backend: String,
    pub max_memory_items: usize,
    pub memory_expiration_secs: u64,
    pub disk_expiration_secs: u64,
    /// Disk tier directory; a temporary directory is allocated when unset.
    pub path: Option<PathBuf>,
    pub cleanup: bool,
    /// Age after which stale temporary directories are removed at startup,
    /// `0` to skip the scan.
    pub remove_older_than_secs: u64,
    pub move_to_disk_on_expiration: bool,
    pub temp_prefix: String,
}

impl Default for HybridSettings {
    fn default() -> Self {
        Self {
            mode: "hybrid".to_string(),
            backend: "redb".to_string(),
            max_memory_items: 2500,
            memory_expiration_secs: 0,
            disk_expiration_secs: 0,
            path: None,
            cleanup: true,
            remove_older_than_secs: 48 * 60 * 60,
            move_to_disk_on_expiration: true,
            temp_prefix: "tierkv-".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileKvSettings {
    pub dedupe: bool,
    pub max_items: usize,
    /// One of `none`, `gzip`, `bzip2` or `zstd`.
    pub compression: String,
    pub skip_empty: bool,
    pub cleanup: bool,
    pub separator: String,
}

impl Default for FileKvSettings {
    fn default() -> Self {
        Self {
            dedupe: true,
            max_items: i16::MAX as usize,
            compression: "none".to_string(),
            skip_empty: true,
            cleanup: true,
            separator: ";;;".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from [`default_path`](Self::default_path)
    /// when `None`. An explicit path must exist; a missing default file is
    /// skipped.
    #[instrument(level = "debug")]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|path| path.is_file()),
        };
        let settings: Self = Self::figment(file.as_deref())?.extract().or_raise(|| ErrorKind::Invalid)?;
        tracing::debug!(file = ?file, "Loaded settings");
        Ok(settings)
    }

    /// The layered provider chain behind [`load`](Self::load).
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = file {
            figment = match file.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file_exact(file)),
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(file)),
                Some("json") => figment.merge(Json::file_exact(file)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(file.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split(ENV_SEPARATOR)))
    }

    /// `tierkv.toml` in the platform configuration directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", FILE_STEM).map(|dirs| dirs.config_dir().join(format!("{FILE_STEM}.toml")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.hybrid.max_memory_items, 2500);
        assert_eq!(settings.hybrid.remove_older_than_secs, 172_800);
        assert!(settings.hybrid.move_to_disk_on_expiration);
        assert_eq!(settings.filekv.max_items, 32767);
        assert_eq!(settings.cache.policy, "lru");
    }

    #[rstest]
    #[case("settings.ini")]
    #[case("settings")]
    fn unknown_extension_is_rejected(#[case] name: &str) {
        let err = Settings::figment(Some(Path::new(name))).unwrap_err();
        assert!(matches!(*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[test]
    fn missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("tierkv.toml"))).unwrap_err();
        assert!(matches!(*err, ErrorKind::NotFound(_)));
    }
}
