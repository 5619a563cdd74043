#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use verirun::jvm::JVM_LIBRARY_NAME;
use verirun::{EnvSnapshot, HarnessConfig};

/// Fake driver: logs its arguments and environment, fails on FAIL, sleeps on HANG.
/// Arguments are `-L <dir> --extern <name>=<rlib> <input> [extra...]`.
pub const DRIVER_SCRIPT: &str = r#"#!/bin/sh
printf '%s\n' "$5" >> "$INVOCATION_LOG"
printf 'ARGS=%s\nSEARCH=%s\nJAVA_HOME=%s\n' "$*" "$LD_LIBRARY_PATH" "$JAVA_HOME" > "$INVOCATION_LOG.last"
if grep -q HANG "$5"; then
    sleep 5
fi
if grep -q FAIL "$5"; then
    echo "error: assertion might not hold" >&2
    exit 1
fi
echo "verified $5"
exit 0
"#;

/// A throwaway project with toolchain pin, JDK, build output and driver
pub struct Project {
    pub tmp: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let project = Self { tmp };
        let root = project.root();

        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("rust-toolchain"), "nightly-2018-06-27\n").unwrap();

        let jvm_lib = project.jdk().join("jre/lib/amd64/server");
        fs::create_dir_all(&jvm_lib).unwrap();
        fs::write(jvm_lib.join(JVM_LIBRARY_NAME), b"").unwrap();

        for profile in ["debug", "release"] {
            let deps = root.join("target").join(profile).join("deps");
            fs::create_dir_all(&deps).unwrap();
            fs::write(deps.join("libverify_contracts-5d1c9a7e.rlib"), b"").unwrap();
            write_executable(
                &root.join("target").join(profile).join("verify-driver"),
                DRIVER_SCRIPT,
            );
        }
        fs::create_dir_all(root.join("corpus")).unwrap();
        project
    }

    pub fn root(&self) -> PathBuf {
        self.tmp.path().join("project")
    }

    pub fn jdk(&self) -> PathBuf {
        self.tmp.path().join("jdk")
    }

    pub fn corpus(&self) -> PathBuf {
        self.root().join("corpus")
    }

    pub fn invocation_log(&self) -> PathBuf {
        self.tmp.path().join("invocations")
    }

    pub fn timing_log(&self) -> PathBuf {
        self.root().join("target/verify-timing.log")
    }

    pub fn add_case(&self, name: &str, body: &str) -> PathBuf {
        let path = self.corpus().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, body).unwrap();
        path
    }

    pub fn env(&self) -> EnvSnapshot {
        EnvSnapshot::from_pairs([
            ("RUSTUP_HOME", self.tmp.path().join("rustup").display().to_string()),
            ("JAVA_HOME", self.jdk().display().to_string()),
            ("INVOCATION_LOG", self.invocation_log().display().to_string()),
            ("RUST_LOG", "warn".to_string()),
        ])
    }

    pub fn config(&self) -> HarnessConfig {
        let mut config = HarnessConfig::from_env(self.root(), &self.env());
        config.corpus_extension = "src".to_string();
        config.passthrough_vars.push("INVOCATION_LOG".to_string());
        config
    }

    /// Inputs the driver was launched on, in order
    pub fn invocations(&self) -> Vec<String> {
        fs::read_to_string(self.invocation_log())
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn last_invocation(&self) -> String {
        let mut path = self.invocation_log().into_os_string();
        path.push(".last");
        fs::read_to_string(path).unwrap_or_default()
    }

    pub fn timing_lines(&self) -> Vec<String> {
        fs::read_to_string(self.timing_log())
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

#[cfg(unix)]
pub fn write_executable(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}
