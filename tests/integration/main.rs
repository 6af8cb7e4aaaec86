//! Integration tests for nss-updatedb

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn updatedb() -> Command {
        cargo_bin_cmd!("nss-updatedb")
    }

    /// Temp directory holding flat source files, a config pointing at them
    /// and a cache directory that does not exist yet
    struct Fixture {
        dir: TempDir,
        config: PathBuf,
    }

    impl Fixture {
        fn new(passwd: &str, group: &str) -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path();
            fs::write(root.join("passwd"), passwd).unwrap();
            fs::write(root.join("group"), group).unwrap();

            let config = root.join("config.toml");
            fs::write(
                &config,
                format!(
                    r#"
[maps]
passwd = "{cache}/passwd.db"
group = "{cache}/group.db"

[sources]
passwd_file = "{root}/passwd"
group_file = "{root}/group"
"#,
                    cache = root.join("cache").display(),
                    root = root.display(),
                ),
            )
            .unwrap();

            Self { dir, config }
        }

        fn cmd(&self) -> Command {
            let mut cmd = updatedb();
            cmd.env_remove("NSS_UPDATEDB_CONFIG")
                .arg("--config")
                .arg(&self.config);
            cmd
        }

        fn cache(&self, name: &str) -> PathBuf {
            self.dir.path().join("cache").join(name)
        }
    }

    fn cache_entries(dir: &Path) -> usize {
        fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    const PASSWD: &str = "\
alice:x:1000:1000:Alice:/home/alice:/bin/sh
alice:x:1001:1000:Alice Again:/home/alice2:/bin/sh
";

    const GROUP: &str = "\
wheel:x:10:root,alice
users:x:100:
";

    #[test]
    fn help_displays() {
        updatedb()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("nss_db style passwd and group caches"));
    }

    #[test]
    fn version_displays() {
        updatedb()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("nss-updatedb"));
    }

    #[test]
    fn update_publishes_both_maps() {
        let fx = Fixture::new(PASSWD, GROUP);

        fx.cmd()
            .args(["update", "files"])
            .assert()
            .success()
            .stdout(predicate::str::diff("passwd... done.\ngroup... done.\n"));

        assert!(fx.cache("passwd.db").exists());
        assert!(fx.cache("group.db").exists());
        // No staging files left behind
        assert_eq!(cache_entries(&fx.dir.path().join("cache")), 2);
    }

    #[test]
    fn duplicate_name_keeps_first_owner() {
        let fx = Fixture::new(PASSWD, GROUP);
        fx.cmd().args(["update", "files", "passwd"]).assert().success();

        fx.cmd()
            .args(["lookup", "passwd", "--name", "alice"])
            .assert()
            .success()
            .stdout("alice:x:1000:1000:Alice:/home/alice:/bin/sh\n");

        fx.cmd()
            .args(["lookup", "passwd", "--id", "1001"])
            .assert()
            .success()
            .stdout("alice:x:1001:1000:Alice Again:/home/alice2:/bin/sh\n");

        fx.cmd()
            .args(["lookup", "passwd", "--index", "1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Alice Again"));
    }

    #[test]
    fn group_lookup_by_gid() {
        let fx = Fixture::new(PASSWD, GROUP);
        fx.cmd().args(["update", "files", "group"]).assert().success();

        fx.cmd()
            .args(["lookup", "group", "--id", "10"])
            .assert()
            .success()
            .stdout("wheel:x:10:root,alice\n");
        assert!(!fx.cache("passwd.db").exists());
    }

    #[test]
    fn missing_key_exits_not_found() {
        let fx = Fixture::new(PASSWD, GROUP);
        fx.cmd().args(["update", "files", "passwd"]).assert().success();

        fx.cmd()
            .args(["lookup", "passwd", "--name", "mallory"])
            .assert()
            .code(67)
            .stdout(predicate::str::is_empty());
    }

    #[test]
    fn db_service_is_refused() {
        let fx = Fixture::new(PASSWD, GROUP);
        fx.cmd()
            .args(["update", "db"])
            .assert()
            .code(69)
            .stderr(predicate::str::contains(
                "Cannot run nss-updatedb against nss_db",
            ));
        assert!(!fx.cache("passwd.db").exists());
    }

    #[test]
    fn source_failure_reports_unavailable() {
        let fx = Fixture::new(PASSWD, GROUP);
        fs::remove_file(fx.dir.path().join("passwd")).unwrap();

        fx.cmd()
            .args(["update", "files"])
            .assert()
            .code(69)
            .stdout(predicate::str::diff("passwd... nameservice unavailable.\n"));
    }

    #[test]
    fn dry_run_publishes_nothing() {
        let fx = Fixture::new(PASSWD, GROUP);
        fx.cmd()
            .args(["update", "files", "--dry-run"])
            .assert()
            .success()
            .stdout(predicate::str::contains("passwd... done."));

        assert!(!fx.cache("passwd.db").exists());
        assert!(!fx.cache("group.db").exists());
    }

    #[test]
    fn path_override_flag() {
        let fx = Fixture::new(PASSWD, GROUP);
        let target = fx.dir.path().join("elsewhere.db");

        fx.cmd()
            .args(["update", "files", "passwd", "--passwd-db"])
            .arg(&target)
            .assert()
            .success();
        assert!(target.exists());

        fx.cmd()
            .args(["lookup", "passwd", "--name", "alice", "--db"])
            .arg(&target)
            .assert()
            .success();
    }

    #[test]
    fn status_reports_json() {
        let fx = Fixture::new(PASSWD, GROUP);
        fx.cmd().args(["update", "files", "passwd"]).assert().success();

        fx.cmd()
            .args(["status", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"readable\": true"))
            .stdout(predicate::str::contains("\"records\": 2"))
            .stdout(predicate::str::contains("\"present\": false"));
    }

    #[test]
    fn negative_ids_are_indexed() {
        let fx = Fixture::new(
            "nobody:x:-2:-2:Nobody:/:/bin/false\nroot:x:0:0:root:/root:/bin/sh\n",
            GROUP,
        );
        fx.cmd().args(["update", "files", "passwd"]).assert().success();

        fx.cmd()
            .args(["lookup", "passwd", "--id", "-2"])
            .assert()
            .success()
            .stdout("nobody:x:-2:-2:Nobody:/:/bin/false\n");

        fx.cmd()
            .args(["lookup", "passwd", "--name", "root"])
            .assert()
            .success()
            .stdout(predicate::str::contains("root:x:0:0"));
    }

    #[test]
    fn config_path() {
        let fx = Fixture::new(PASSWD, GROUP);
        fx.cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let fx = Fixture::new(PASSWD, GROUP);
        fx.cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[update]"))
            .stdout(predicate::str::contains("refuse_empty = false"));
    }

    #[test]
    fn config_init_respects_force() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("nested").join("config.toml");

        updatedb()
            .arg("--config")
            .arg(&config)
            .args(["config", "init"])
            .assert()
            .success();
        assert!(fs::read_to_string(&config).unwrap().contains("[maps]"));

        fs::write(&config, "# edited\n").unwrap();
        updatedb()
            .arg("--config")
            .arg(&config)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
        assert_eq!(fs::read_to_string(&config).unwrap(), "# edited\n");
    }

    #[test]
    fn lookup_requires_a_key() {
        updatedb()
            .args(["lookup", "passwd"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("required"));
    }
}
