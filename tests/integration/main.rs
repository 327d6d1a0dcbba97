//! Integration tests for halocat

mod catalog_cache_tests {
    use halocat::cache::{ColumnarFileStore, RemoveOptions, TableStore};
    use halocat::{CacheLogEntry, CacheRequest, CatalogArgs, HaloCatalog, HaloTableCache};
    use serial_test::serial;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const NUM_HALOS: usize = 100;
    const LBOX: f64 = 200.0;

    fn valid_catalog() -> HaloCatalog {
        let step = (LBOX - 1.0) / (NUM_HALOS - 1) as f64;
        let positions: Vec<f64> = (0..NUM_HALOS).map(|i| i as f64 * step).collect();
        let args = CatalogArgs::new()
            .with("Lbox", LBOX)
            .with("particle_mass", 1.35e8)
            .with("redshift", 0.0)
            .with("halo_x", positions.clone())
            .with("halo_y", positions.iter().rev().copied().collect::<Vec<_>>())
            .with("halo_z", positions)
            .with("halo_id", (1..=NUM_HALOS as i64).collect::<Vec<_>>())
            .with("halo_mass", vec![1e12; NUM_HALOS])
            .with("cosmology", "planck15");
        HaloCatalog::new(args).unwrap()
    }

    #[test]
    fn register_then_remove_end_to_end() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("cache").join("halo_table_cache_log.txt");
        let fname = dir.path().join("abc.hdf5");

        let mut halocat = valid_catalog();
        assert_eq!(halocat.num_halos(), NUM_HALOS);

        let mut cache = HaloTableCache::open(&log_path).unwrap();
        let request = CacheRequest::new(
            &fname,
            "dummy_simname",
            "dummy_halo_finder",
            "dummy_version_name",
            "dummy processing notes",
        )
        .overwrite(true)
        .with_metadata("some_additional_metadata", "dummy processing notes");
        halocat.add_to_cache(&mut cache, request).unwrap();

        let entry = halocat.log_entry().cloned().unwrap();
        let cache = HaloTableCache::open(&log_path).unwrap();
        assert!(cache.contains(&entry));

        let attrs = ColumnarFileStore.read_attrs(&fname).unwrap();
        assert_eq!(attrs["cosmology"], "planck15");
        assert_eq!(attrs["halo_finder"], "dummy_halo_finder");

        let mut cache = cache;
        let key = CacheLogEntry::new(
            "dummy_simname",
            "dummy_halo_finder",
            "dummy_version_name",
            0.0,
            &fname,
        )
        .unwrap();
        cache
            .remove_entry(
                &key,
                RemoveOptions {
                    raise_if_missing: true,
                    update_log: true,
                    delete_file: true,
                },
            )
            .unwrap();

        assert!(!fname.exists());
        assert!(!HaloTableCache::open(&log_path).unwrap().contains(&entry));
    }

    #[test]
    #[serial]
    fn relative_fname_is_logged_absolute() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("cats")).unwrap();
        let original_cwd = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let mut cache = HaloTableCache::open(dir.path().join("log.txt")).unwrap();
        let request = CacheRequest::new("cats/rel.hdf5", "sim", "finder", "v1", "notes");
        let result = valid_catalog().add_to_cache(&mut cache, request);

        std::env::set_current_dir(original_cwd).unwrap();

        let entry = result.unwrap();
        assert!(entry.fname.is_absolute());
        assert!(entry.fname.ends_with(PathBuf::from("cats").join("rel.hdf5")));
        assert!(entry.fname.is_file());
    }
}

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use halocat::{CacheRequest, CatalogArgs, HaloCatalog, HaloTableCache};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn halocat(home: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("halocat");
        cmd.env("HALOCAT_CONFIG", home.join("config.toml"))
            .env("HALOCAT_CACHE_DIR", home.join("cache"));
        cmd
    }

    fn register_sample(home: &Path) -> std::path::PathBuf {
        let positions: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let args = CatalogArgs::new()
            .with("Lbox", 20.0)
            .with("particle_mass", 1e8)
            .with("redshift", 1.0)
            .with("halo_x", positions.clone())
            .with("halo_y", positions.clone())
            .with("halo_z", positions)
            .with("halo_id", (0..10i64).collect::<Vec<_>>())
            .with("halo_mass", vec![1e11; 10]);
        let mut catalog = HaloCatalog::new(args).unwrap();

        let fname = home.join("sample.hdf5");
        let mut cache =
            HaloTableCache::open(home.join("cache").join("halo_table_cache_log.txt")).unwrap();
        catalog
            .add_to_cache(
                &mut cache,
                CacheRequest::new(&fname, "bolshoi", "rockstar", "v1", "test"),
            )
            .unwrap();
        fname
    }

    #[test]
    fn help_displays() {
        let home = TempDir::new().unwrap();
        halocat(home.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("halo catalog"));
    }

    #[test]
    fn version_displays() {
        let home = TempDir::new().unwrap();
        halocat(home.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("halocat"));
    }

    #[test]
    fn config_path() {
        let home = TempDir::new().unwrap();
        halocat(home.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let home = TempDir::new().unwrap();
        halocat(home.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"));
    }

    #[test]
    fn list_empty() {
        let home = TempDir::new().unwrap();
        halocat(home.path())
            .args(["list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached halo catalogs"));
    }

    #[test]
    fn list_shows_registered_catalog() {
        let home = TempDir::new().unwrap();
        let fname = register_sample(home.path());

        halocat(home.path())
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(fname.display().to_string()));

        halocat(home.path())
            .args(["list", "--simname", "multidark"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached halo catalogs"));
    }

    #[test]
    fn verify_detects_missing_file() {
        let home = TempDir::new().unwrap();
        let fname = register_sample(home.path());

        halocat(home.path()).arg("verify").assert().success();

        std::fs::remove_file(&fname).unwrap();
        halocat(home.path())
            .arg("verify")
            .assert()
            .failure()
            .stdout(predicate::str::contains("catalog file does not exist"));
    }

    #[test]
    fn inspect_shows_attributes() {
        let home = TempDir::new().unwrap();
        let fname = register_sample(home.path());

        halocat(home.path())
            .arg("inspect")
            .arg(&fname)
            .assert()
            .success()
            .stdout(predicate::str::contains("simname").and(predicate::str::contains("halo_mass")));
    }

    #[test]
    fn remove_deletes_entry_and_file() {
        let home = TempDir::new().unwrap();
        let fname = register_sample(home.path());

        halocat(home.path())
            .args(["remove", "bolshoi", "rockstar", "v1", "1.0"])
            .arg(&fname)
            .arg("--delete-file")
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed"));

        assert!(!fname.exists());
    }

    #[test]
    fn remove_strict_missing_entry() {
        let home = TempDir::new().unwrap();
        halocat(home.path())
            .args(["remove", "nosuch", "rockstar", "v1", "0.0", "/tmp/nosuch.hdf5", "--strict"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No cache log entry matches"));
    }
}
