use figment::Jail;
use rstest::rstest;
use std::path::Path;
use tierkv_config::Settings;
use tierkv_config::error::ErrorKind;

#[rstest]
#[case("tierkv.toml", "[hybrid]\nmode = \"disk\"\nmax_memory_items = 10\n")]
#[case("tierkv.yaml", "hybrid:\n  mode: disk\n  max_memory_items: 10\n")]
#[case("tierkv.json", r#"{"hybrid": {"mode": "disk", "max_memory_items": 10}}"#)]
fn file_overrides_defaults(#[case] name: &str, #[case] contents: &str) {
    Jail::expect_with(|jail| {
        jail.create_file(name, contents)?;
        let settings = Settings::load(Some(Path::new(name))).unwrap();
        assert_eq!(settings.hybrid.mode, "disk");
        assert_eq!(settings.hybrid.max_memory_items, 10);
        assert_eq!(settings.hybrid.backend, "redb");
        assert!(settings.filekv.dedupe);
        Ok(())
    });
}

#[test]
fn environment_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file("tierkv.toml", "[cache]\npolicy = \"lfu\"\ncapacity = 5\n")?;
        jail.set_env("TIERKV_CACHE__CAPACITY", "50");
        jail.set_env("TIERKV_FILEKV__COMPRESSION", "gzip");
        let settings = Settings::load(Some(Path::new("tierkv.toml"))).unwrap();
        assert_eq!(settings.cache.policy, "lfu");
        assert_eq!(settings.cache.capacity, 50);
        assert_eq!(settings.filekv.compression, "gzip");
        Ok(())
    });
}

#[test]
fn wrong_type_is_invalid() {
    Jail::expect_with(|jail| {
        jail.create_file("tierkv.toml", "[hybrid]\nmax_memory_items = \"many\"\n")?;
        let err = Settings::load(Some(Path::new("tierkv.toml"))).unwrap_err();
        assert_eq!(*err, ErrorKind::Invalid);
        Ok(())
    });
}
