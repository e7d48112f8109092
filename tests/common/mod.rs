//! Common test utilities for stackup integration tests

#![allow(clippy::expect_used)]

use std::path::PathBuf;

use assert_cmd::Command;
use tempfile::TempDir;

#[allow(dead_code)]
pub const DEBIAN_OS_RELEASE: &str = "PRETTY_NAME=\"Debian GNU/Linux 12 (bookworm)\"\n\
                                     ID=debian\n\
                                     VERSION_ID=\"12\"\n\
                                     VERSION_CODENAME=bookworm\n";

/// A scratch directory holding a stack configuration and a fake host root
pub struct TestStack {
    /// Temporary directory
    #[allow(dead_code)]
    pub temp: TempDir,
    /// Path to the scratch root
    pub path: PathBuf,
}

impl TestStack {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = temp.path().to_path_buf();
        Self { temp, path }
    }

    /// Write a file below the scratch root
    pub fn write_file(&self, path: &str, content: &str) -> PathBuf {
        let file_path = self.path.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
        file_path
    }

    /// Load a fixture configuration, pointing its host paths into the scratch root
    pub fn config_from_fixture(&self, fixture_name: &str) -> PathBuf {
        let fixture_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(fixture_name);
        let yaml = std::fs::read_to_string(&fixture_path).expect("Failed to read fixture");
        let yaml = yaml.replace("@ROOT@", &self.path.display().to_string());
        self.write_file("stackup.yaml", &yaml)
    }

    /// `stackup` running inside the scratch root with no ambient configuration
    #[allow(dead_code)]
    pub fn cmd(&self) -> Command {
        let mut cmd = stackup_cmd();
        cmd.current_dir(&self.path)
            .env_remove("STACKUP_CONFIG")
            .env_remove("STACKUP_LOG")
            .env("XDG_CONFIG_HOME", self.path.join("xdg"));
        cmd
    }
}

// Temporary fix for deprecated cargo_bin - will be updated when build-dir issues are resolved
#[allow(deprecated)]
pub fn stackup_cmd() -> Command {
    Command::cargo_bin("stackup").expect("stackup binary is built")
}
