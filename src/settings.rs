//! Conversion of loaded [`Settings`] into typed store options.

use crate::error::{ErrorKind, Result};
use crate::options::HybridOptions;
use exn::ResultExt;
use std::path::PathBuf;
use std::time::Duration;
use tierkv_cache::CacheOptions;
use tierkv_compress::Compression;
use tierkv_config::{CacheSettings, FileKvSettings, Settings};
use tierkv_filekv::FileKvOptions;

fn secs(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

fn parse<T: std::str::FromStr<Err = String>>(value: &str) -> Result<T> {
    value.parse().map_err(|err| exn::Exn::from(ErrorKind::InvalidConfig(err)))
}

impl HybridOptions {
    /// Hybrid store options from the `[hybrid]` section, with the eviction
    /// policy and sweep interval of the `[cache]` section.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let hybrid = &settings.hybrid;
        Ok(Self {
            mode: parse(&hybrid.mode)?,
            backend: parse(&hybrid.backend)?,
            memory_expiration: secs(hybrid.memory_expiration_secs),
            disk_expiration: secs(hybrid.disk_expiration_secs),
            sweep_interval: secs(settings.cache.sweep_interval_secs),
            policy: parse(&settings.cache.policy)?,
            path: hybrid.path.clone(),
            cleanup: hybrid.cleanup,
            max_memory_items: hybrid.max_memory_items,
            on_evicted: None,
            remove_older_than: secs(hybrid.remove_older_than_secs),
            move_to_disk_on_expiration: hybrid.move_to_disk_on_expiration,
            temp_root: None,
            temp_prefix: hybrid.temp_prefix.clone(),
        })
    }
}

/// Standalone cache options from the `[cache]` section.
pub fn cache_options(settings: &CacheSettings) -> Result<CacheOptions> {
    Ok(CacheOptions {
        capacity: settings.capacity,
        policy: parse(&settings.policy)?,
        default_ttl: secs(settings.ttl_secs),
        sweep_interval: secs(settings.sweep_interval_secs),
        listener: None,
    })
}

/// FileKv options for a final store at `path` from the `[filekv]` section.
pub fn filekv_options(settings: &FileKvSettings, path: impl Into<PathBuf>) -> Result<FileKvOptions> {
    let compression = settings
        .compression
        .parse::<Compression>()
        .or_raise(|| ErrorKind::InvalidConfig(format!("unknown compression: {}", settings.compression)))?;
    Ok(FileKvOptions::new(path)
        .with_dedupe(settings.dedupe)
        .with_max_items(settings.max_items)
        .with_compression(compression)
        .with_skip_empty(settings.skip_empty)
        .with_cleanup(settings.cleanup)
        .with_separator(settings.separator.clone()))
}
