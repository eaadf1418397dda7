use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Refuses connections, so backend calls fail fast.
pub const DEAD_NODE: &str = "http://127.0.0.1:9";

pub struct TestEnv {
    _tmp: TempDir,
    pub home: PathBuf,
    pub tmp_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let home = tmp.path().join("home");
        let tmp_dir = tmp.path().join("tmp");
        fs::create_dir_all(&home).expect("create isolated home");
        fs::create_dir_all(&tmp_dir).expect("create isolated temp dir");
        Self {
            _tmp: tmp,
            home,
            tmp_dir,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("jaklis");
        cmd.env("HOME", &self.home)
            .env("TMPDIR", &self.tmp_dir)
            .env_remove("DUNITER")
            .env_remove("ESNODE")
            .env_remove("DUNIKEY")
            .env_remove("RUST_LOG");
        cmd
    }

    pub fn settings_file(&self) -> PathBuf {
        self.home.join(".config/jaklis/settings.toml")
    }

    /// Throwaway keyfiles left behind in the temp dir.
    pub fn ephemeral_keys(&self) -> Vec<String> {
        fs::read_dir(&self.tmp_dir)
            .expect("read temp dir")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| n.starts_with("secret.dunikey-"))
            .collect()
    }
}
