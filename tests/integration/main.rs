//! Integration tests for precache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// A project directory, an isolated HOME and a cache backend directory
    struct Sandbox {
        _temp: TempDir,
        app: PathBuf,
        home: PathBuf,
        cache: PathBuf,
    }

    impl Sandbox {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let app = temp.path().join("app");
            let home = temp.path().join("home");
            let cache = temp.path().join("cache");
            fs::create_dir_all(&app).unwrap();
            fs::create_dir_all(&home).unwrap();
            Self {
                _temp: temp,
                app,
                home,
                cache,
            }
        }

        /// Write precache.toml with the given precompile command and extra TOML
        fn configure(&self, precompile: &str, extra: &str) {
            let config = format!(
                "[cache]\ndir = '{}'\n\n[tasks]\n\"assets:precompile\" = '{}'\n\n{}\n",
                self.cache.display(),
                precompile,
                extra
            );
            fs::write(self.app.join("precache.toml"), config).unwrap();
        }

        fn cmd(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("precache");
            cmd.env("HOME", &self.home)
                .env_remove("PRECACHE_CONFIG")
                .arg("--plain")
                .arg("-C")
                .arg(&self.app);
            cmd
        }

        fn write(&self, rel: &str, contents: &str) {
            let path = self.app.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.app.join(rel)
        }
    }

    fn precache() -> Command {
        cargo_bin_cmd!("precache")
    }

    #[test]
    fn help_displays() {
        precache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("build-time asset cache manager"));
    }

    #[test]
    fn version_displays() {
        precache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("precache"));
    }

    #[test]
    fn config_path() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("precache.toml"));
    }

    #[test]
    fn config_show() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[build]"))
            .stdout(predicate::str::contains("rails4"));
    }

    #[test]
    fn config_init_refuses_to_overwrite() {
        let sandbox = Sandbox::new();
        sandbox.cmd().args(["config", "init"]).assert().success();
        assert!(sandbox.path("precache.toml").exists());

        sandbox
            .cmd()
            .args(["config", "init"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"))
            .stderr(predicate::str::contains("--force"));

        sandbox
            .cmd()
            .args(["config", "init", "--force"])
            .assert()
            .success();
    }

    #[test]
    fn invalid_config_reported() {
        let sandbox = Sandbox::new();
        sandbox.write("precache.toml", "[build]\nvariant = \"rails7\"\n");
        sandbox
            .cmd()
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn compile_stores_cache_for_next_build() {
        let sandbox = Sandbox::new();
        sandbox.configure(
            "mkdir -p public/assets tmp/cache/assets && echo compiled > public/assets/app.js && echo sass > tmp/cache/assets/sprockets.cache && echo Compiling application.js",
            "",
        );

        sandbox
            .cmd()
            .arg("compile")
            .assert()
            .success()
            .stdout(predicate::str::contains("Compiling application.js"))
            .stdout(predicate::str::contains("Asset precompilation completed"));

        sandbox
            .cmd()
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("public/assets"))
            .stdout(predicate::str::contains("tmp/cache/assets"));

        // Next build starts from a clean checkout; the task only succeeds if
        // the intermediate cache was restored before it ran
        fs::remove_dir_all(sandbox.path("public")).unwrap();
        fs::remove_dir_all(sandbox.path("tmp")).unwrap();
        sandbox.configure("test -f tmp/cache/assets/sprockets.cache", "");

        sandbox.cmd().arg("compile").assert().success();
        assert_eq!(
            fs::read_to_string(sandbox.path("public/assets/app.js")).unwrap(),
            "compiled\n"
        );
    }

    #[test]
    fn compile_failure_reports_output_and_stores_nothing() {
        let sandbox = Sandbox::new();
        sandbox.configure(
            "mkdir -p public/assets && echo SassC::SyntaxError: Invalid CSS && exit 3",
            "",
        );

        sandbox
            .cmd()
            .arg("compile")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Precompiling assets failed"))
            .stderr(predicate::str::contains("SassC::SyntaxError: Invalid CSS"));

        sandbox
            .cmd()
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache entries found"));
    }

    #[test]
    fn compile_skips_when_manifest_present() {
        let sandbox = Sandbox::new();
        sandbox.configure("exit 1", "");
        sandbox.write("public/assets/.sprockets-manifest-0a1b2c.json", "{}");

        sandbox
            .cmd()
            .arg("compile")
            .assert()
            .success()
            .stdout(predicate::str::contains("Detected manifest file"));
    }

    #[test]
    fn compile_skips_when_task_undefined() {
        let sandbox = Sandbox::new();
        sandbox.configure("", "");

        sandbox
            .cmd()
            .arg("compile")
            .assert()
            .success()
            .stdout(predicate::str::contains("task undefined"));
    }

    #[test]
    fn compile_skips_default_rake_task_without_rakefile() {
        let sandbox = Sandbox::new();
        sandbox.write(
            "precache.toml",
            &format!(
                "[cache]\ndir = '{}'\n\n[tasks.env]\nRAILS_ENV = 'production'\n",
                sandbox.cache.display()
            ),
        );

        sandbox
            .cmd()
            .arg("compile")
            .assert()
            .success()
            .stdout(predicate::str::contains("task undefined"));
    }

    #[test]
    fn compile_teardown_removes_scratch_when_disabled() {
        let sandbox = Sandbox::new();
        sandbox.configure(
            "mkdir -p node_modules/pkg tmp/cache/assets",
            "[build]\nassets_compile = false\n",
        );

        sandbox.cmd().arg("compile").assert().success();

        assert!(!sandbox.path("node_modules").exists());
        assert!(!sandbox.path("tmp/cache/assets").exists());
    }

    #[test]
    fn cleanup_removes_scratch_directories() {
        let sandbox = Sandbox::new();
        sandbox.write("tmp/cache/assets/sprockets/a.cache", "x");
        sandbox.write("node_modules/left-pad/index.js", "x");
        sandbox.write("public/packs/app.js", "x");

        sandbox
            .cmd()
            .args(["cleanup", "--assets-compile-disabled"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed"));

        assert!(!sandbox.path("tmp/cache/assets").exists());
        assert!(!sandbox.path("node_modules").exists());
        assert!(sandbox.path("public/packs/app.js").exists());

        sandbox
            .cmd()
            .args(["cleanup", "--assets-compile-disabled"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing to remove"));
    }

    #[test]
    fn cleanup_keeps_directories_by_default() {
        let sandbox = Sandbox::new();
        sandbox.write("node_modules/left-pad/index.js", "x");

        sandbox.cmd().arg("cleanup").assert().success();
        assert!(sandbox.path("node_modules/left-pad/index.js").exists());
    }

    fn write_with_mtime(path: &Path, bytes: usize, mtime: i64) {
        fs::write(path, vec![b'x'; bytes]).unwrap();
        filetime::set_file_mtime(path, filetime::FileTime::from_unix_time(mtime, 0)).unwrap();
    }

    #[test]
    fn clean_stale_removes_oldest() {
        let sandbox = Sandbox::new();
        let dir = sandbox.path("tmp/cache/assets");
        fs::create_dir_all(&dir).unwrap();
        write_with_mtime(&dir.join("a"), 40, 1_000);
        write_with_mtime(&dir.join("b"), 40, 2_000);
        write_with_mtime(&dir.join("c"), 40, 3_000);

        sandbox
            .cmd()
            .args(["clean-stale", "tmp/cache/assets", "--limit", "100"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed 1 file(s)"));

        assert!(!dir.join("a").exists());
        assert!(dir.join("b").exists());
        assert!(dir.join("c").exists());
    }

    #[test]
    fn clean_stale_missing_directory_is_noop() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["clean-stale", "does/not/exist", "--limit", "0"])
            .assert()
            .success()
            .stdout(predicate::str::contains("within budget"));
    }

    #[test]
    fn cache_store_and_load_roundtrip() {
        let sandbox = Sandbox::new();
        sandbox.configure("true", "");
        sandbox.write("public/packs/app.js", "packed");

        sandbox
            .cmd()
            .args(["cache", "store", "public/packs"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Stored public/packs"));

        fs::remove_dir_all(sandbox.path("public/packs")).unwrap();

        sandbox
            .cmd()
            .args(["cache", "load", "public/packs"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Restored public/packs"));
        assert_eq!(
            fs::read_to_string(sandbox.path("public/packs/app.js")).unwrap(),
            "packed"
        );

        sandbox
            .cmd()
            .args(["cache", "load", "public/packs", "--no-overwrite"])
            .assert()
            .success()
            .stdout(predicate::str::contains("left untouched"));

        sandbox
            .cmd()
            .args(["cache", "clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cleared 1 entry"));
    }

    #[test]
    fn cache_list_json_is_valid() {
        let sandbox = Sandbox::new();
        sandbox.configure("true", "");
        sandbox.write("public/assets/app.css", "body{}");
        sandbox
            .cmd()
            .args(["cache", "store", "public/assets"])
            .assert()
            .success();

        let output = sandbox
            .cmd()
            .args(["cache", "list", "--format", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(entries[0]["key"], "public/assets");
        assert_eq!(entries[0]["files"], 1);
    }
}
