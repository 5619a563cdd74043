//! Property-based tests for path resolution and environment composition
//!
//! These tests use proptest to check that:
//! 1. Toolchain resolution is pure path arithmetic
//! 2. The loader search path keeps its fixed order for any layout
//! 3. The JVM lookup finds a single library wherever it is nested
//! 4. Timing log lines read back to the record that produced them

use proptest::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use verirun::environment::compose_from;
use verirun::jvm::{self, JVM_LIBRARY_NAME};
use verirun::toolchain::{self, PinnedToolchainVersion, HOST_TRIPLE};
use verirun::{EnvSnapshot, Error, HarnessConfig, RunProfile, TimingRecord};

// =============================================================================
// STRATEGY GENERATORS
// =============================================================================

/// Toolchain identifiers in the shapes rustup accepts
fn toolchain_id() -> impl Strategy<Value = String> {
    prop_oneof![
        "(stable|beta|nightly)",
        "nightly-20[0-9]{2}-[01][0-9]-[0-3][0-9]",
        "1\\.[0-9]{1,2}\\.[0-9]",
    ]
}

/// Relative directory made of 1-4 simple components
fn relative_dir() -> impl Strategy<Value = PathBuf> {
    prop::collection::vec("[a-z][a-z0-9_]{0,7}", 1..5)
        .prop_map(|parts| parts.iter().collect::<PathBuf>())
}

fn profile() -> impl Strategy<Value = RunProfile> {
    prop_oneof![Just(RunProfile::Debug), Just(RunProfile::Release)]
}

/// Case labels, possibly containing spaces
fn case_label() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9 _/.-]{0,40}[a-z0-9]"
}

// =============================================================================
// TOOLCHAIN
// =============================================================================

proptest! {
    /// Resolution never needs the installation to exist
    #[test]
    fn toolchain_resolve_is_pure(id in toolchain_id(), root in relative_dir()) {
        let root = Path::new("/nonexistent-verirun-root").join(root);
        let version = PinnedToolchainVersion::new(&id).unwrap();
        let lib = toolchain::resolve(&version, &root);

        prop_assert_eq!(
            &lib,
            &root.join("toolchains").join(format!("{id}-{HOST_TRIPLE}")).join("lib")
        );
        prop_assert_eq!(toolchain::resolve(&version, &root), lib);
    }

    /// Surrounding whitespace in the pin file is not part of the identifier
    #[test]
    fn pin_file_identifier_is_trimmed(id in toolchain_id(), pad in "[ \t]{0,3}") {
        let bare = PinnedToolchainVersion::parse(&format!("{pad}{id}{pad}\n")).unwrap();
        prop_assert_eq!(bare.as_str(), id.as_str());

        let table = format!("[toolchain]\n{pad}channel = \"{id}\"\n");
        let channel = PinnedToolchainVersion::parse(&table).unwrap();
        prop_assert_eq!(channel.as_str(), id.as_str());
    }
}

// =============================================================================
// COMPOSITION
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// toolchain lib, JVM lib, profile output, profile deps; nothing else
    #[test]
    fn search_path_order_is_fixed(
        id in toolchain_id(),
        project in relative_dir(),
        target in relative_dir(),
        jvm_lib in relative_dir(),
        profile in profile(),
    ) {
        let project_root = Path::new("/work").join(project);
        let env = EnvSnapshot::from_pairs([
            ("CARGO_TARGET_DIR", target.display().to_string()),
            ("JAVA_HOME", "/opt/jdk".to_string()),
        ]);
        let mut config = HarnessConfig::from_env(&project_root, &env);
        config.profile = profile;

        let version = PinnedToolchainVersion::new(&id).unwrap();
        let jvm_lib = Path::new("/opt/jdk").join(jvm_lib);
        let composed = compose_from(
            &config,
            version.clone(),
            Path::new("/rustup"),
            jvm_lib.clone(),
        ).unwrap();

        let profile_dir = project_root.join(&target).join(profile.dir_name());
        let expected = vec![
            toolchain::resolve(&version, Path::new("/rustup")),
            jvm_lib,
            profile_dir.clone(),
            profile_dir.join("deps"),
        ];
        prop_assert_eq!(composed.search_path.entries(), expected.as_slice());
        prop_assert_eq!(&composed.toolchain_lib_dir, &expected[0]);
    }
}

// =============================================================================
// JVM LOOKUP
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// A single library is found at any depth, with decoys alongside
    #[test]
    fn jvm_single_library_found_at_any_depth(
        nested in relative_dir(),
        decoy in relative_dir(),
    ) {
        let tmp = TempDir::new().unwrap();
        let lib_dir = tmp.path().join(&nested);
        fs::create_dir_all(&lib_dir).unwrap();
        fs::write(lib_dir.join(JVM_LIBRARY_NAME), b"").unwrap();

        let decoy_dir = tmp.path().join("decoys").join(&decoy);
        fs::create_dir_all(&decoy_dir).unwrap();
        fs::write(decoy_dir.join("libjava.so"), b"").unwrap();

        let found = jvm::locate(tmp.path()).unwrap();
        prop_assert_eq!(found, fs::canonicalize(&lib_dir).unwrap());
    }
}

#[test]
fn test_jvm_server_and_client_variants_are_ambiguous() {
    let tmp = TempDir::new().unwrap();
    for variant in ["server", "client"] {
        let dir = tmp.path().join("jre/lib/amd64").join(variant);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(JVM_LIBRARY_NAME), b"").unwrap();
    }

    match jvm::locate(tmp.path()).unwrap_err() {
        Error::AmbiguousDependency { matches, .. } => {
            assert_eq!(matches.len(), 2);
            assert!(matches[0] < matches[1]);
        }
        other => panic!("expected AmbiguousDependency, got {other:?}"),
    }
}

#[test]
fn test_jvm_missing_installation_root() {
    let tmp = TempDir::new().unwrap();
    let err = jvm::locate(&tmp.path().join("no-jdk")).unwrap_err();
    assert!(matches!(err, Error::DependencyNotFound { .. }));
}

// =============================================================================
// TIMING RECORDS
// =============================================================================

proptest! {
    /// The last space separates label from seconds, so labels may contain spaces
    #[test]
    fn timing_line_reads_back(label in case_label(), secs in 0u64..100_000, millis in 0u32..1000) {
        let elapsed = Duration::from_secs(secs) + Duration::from_millis(millis as u64);
        let record = TimingRecord::new(label.clone(), elapsed);
        let parsed = TimingRecord::parse_line(&record.to_line()).unwrap();
        prop_assert_eq!(parsed.case, label);
        prop_assert_eq!(parsed.elapsed_secs, secs);
    }
}
