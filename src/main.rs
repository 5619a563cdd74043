mod cli;

use anyhow::Context;
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, DEFAULT_CORPUS};
use verirun::config::{
    timeout_from_secs, ConfigFile, EnvSnapshot, HarnessConfig, RunProfile, StreamMode,
};
use verirun::suite::TimingLog;
use verirun::{environment, jvm, Error, RunResult, Session, SuiteOutcome};

fn main() -> ExitCode {
    // Stdout belongs to the driver; all harness logging goes to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            let code = err
                .downcast_ref::<Error>()
                .map(|e| e.phase().exit_code())
                .unwrap_or(3);
            ExitCode::from(code as u8)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let cwd = std::env::current_dir().context("determining current directory")?;
    let env = EnvSnapshot::capture();
    let mut config = build_config(&cli, &cwd, &env)?;

    match cli.command {
        Commands::Run { file, extra } => {
            config.extra_args.extend(extra);
            let session = Session::prepare(config)?;
            let input = absolute(&cwd, &file);
            let result = session.invoker().invoke(&input)?;
            forward_captured(&result)?;
            session.invoker().check(&input, result)?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Suite {
            corpus,
            log,
            report,
            ext,
            extra,
        } => {
            if let Some(log) = log {
                config.timing_log = absolute(&cwd, &log);
            }
            if let Some(ext) = ext {
                config.corpus_extension = ext.trim_start_matches('.').to_string();
            }
            config.extra_args.extend(extra);
            let corpus = corpus_dir(&cwd, &config.project_root, corpus.as_deref());
            let session = Session::prepare(config)?;
            let (outcome, suite_report) = session.run_suite(&corpus)?;

            if let Some(path) = report {
                suite_report.write(&absolute(&cwd, &path))?;
            }

            match outcome {
                SuiteOutcome::Completed { records } => {
                    eprintln!(
                        "suite completed: {} case(s), {}s total",
                        records.len(),
                        suite_report.total_secs()
                    );
                    Ok(ExitCode::SUCCESS)
                }
                SuiteOutcome::Aborted {
                    failed_case,
                    result,
                    records,
                } => {
                    forward_captured(&result)?;
                    eprintln!(
                        "suite aborted at {} ({}); {} of {} case(s) attempted",
                        failed_case.path().display(),
                        result.describe(),
                        records.len(),
                        suite_report.cases_total
                    );
                    Ok(ExitCode::from(1))
                }
            }
        }

        Commands::Env { json } => {
            let composed = environment::compose(&config)?;
            let vars = composed.env.to_display_map();
            let mut out = std::io::stdout().lock();
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&vars)?)?;
            } else {
                for (name, value) in vars {
                    writeln!(out, "{name}={value}")?;
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::LocateJvm => {
            let dir = jvm::locate(&config.jvm_root)?;
            println!("{}", dir.display());
            Ok(ExitCode::SUCCESS)
        }

        Commands::Timings { log, top } => {
            let path = log
                .map(|p| absolute(&cwd, &p))
                .unwrap_or(config.timing_log);
            let mut records = TimingLog::new(&path).read_records()?;
            records.sort_by(|a, b| {
                b.elapsed_secs
                    .cmp(&a.elapsed_secs)
                    .then_with(|| a.case.cmp(&b.case))
            });
            let mut out = std::io::stdout().lock();
            for record in records.iter().take(top.unwrap_or(usize::MAX)) {
                writeln!(out, "{:>6}s  {}", record.elapsed_secs, record.case)?;
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Environment, then config file, then CLI flags
fn build_config(cli: &Cli, cwd: &Path, env: &EnvSnapshot) -> anyhow::Result<HarnessConfig> {
    let project_root = absolute(cwd, &cli.project_root);
    let mut config = HarnessConfig::from_env(project_root, env);

    if let Some(path) = &cli.config {
        let path = absolute(cwd, path);
        let file = ConfigFile::load(&path)
            .with_context(|| format!("loading config {}", path.display()))?;
        config = config.with_file(file);
    }

    if cli.release {
        config.profile = RunProfile::Release;
    }
    if let Some(secs) = cli.timeout_secs {
        config.timeout = timeout_from_secs(secs);
    }
    if cli.capture {
        config.stream_mode = StreamMode::Capture;
    }
    Ok(config)
}

/// An explicit corpus is taken relative to the working directory
fn corpus_dir(cwd: &Path, project_root: &Path, corpus: Option<&Path>) -> PathBuf {
    match corpus {
        Some(path) => absolute(cwd, path),
        None => project_root.join(DEFAULT_CORPUS),
    }
}

fn absolute(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Replay captured driver output unaltered
fn forward_captured(result: &RunResult) -> std::io::Result<()> {
    std::io::stdout().lock().write_all(&result.stdout)?;
    std::io::stderr().lock().write_all(&result.stderr)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::time::Duration;
    use tempfile::TempDir;

    fn env() -> EnvSnapshot {
        EnvSnapshot::from_pairs([("HOME", "/home/dev"), ("JAVA_HOME", "/opt/jdk")])
    }

    fn args(words: &[&str]) -> Vec<OsString> {
        words.iter().map(OsString::from).collect()
    }

    fn config_file(tmp: &TempDir, json: &str) -> PathBuf {
        let path = tmp.path().join("verirun.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_flags_override_config_file() {
        let tmp = TempDir::new().unwrap();
        let file = config_file(
            &tmp,
            r#"{"profile": "debug", "timeout_secs": 30, "capture_output": false}"#,
        );
        let mut argv = args(&["verirun", "--config"]);
        argv.push(file.into_os_string());
        argv.extend(args(&["--release", "--timeout-secs", "0", "--capture", "env"]));
        let cli = Cli::parse_from(argv);

        let config = build_config(&cli, tmp.path(), &env()).unwrap();
        assert_eq!(config.profile, RunProfile::Release);
        assert_eq!(config.timeout, None);
        assert_eq!(config.stream_mode, StreamMode::Capture);
    }

    #[test]
    fn test_config_file_applies_without_flags() {
        let tmp = TempDir::new().unwrap();
        let file = config_file(
            &tmp,
            r#"{"profile": "release", "timeout_secs": 30, "capture_output": true}"#,
        );
        let mut argv = args(&["verirun", "--config"]);
        argv.push(file.into_os_string());
        argv.push("env".into());
        let cli = Cli::parse_from(argv);

        let config = build_config(&cli, tmp.path(), &env()).unwrap();
        assert_eq!(config.profile, RunProfile::Release);
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.stream_mode, StreamMode::Capture);
        assert_eq!(config.jvm_root, PathBuf::from("/opt/jdk"));
    }

    #[test]
    fn test_default_corpus_follows_project_root() {
        let cli = Cli::parse_from(["verirun", "--project-root", "/srv/proj", "suite"]);
        let config = build_config(&cli, Path::new("/home/dev"), &env()).unwrap();
        let Commands::Suite { corpus, .. } = cli.command else {
            panic!("expected suite command");
        };
        assert_eq!(
            corpus_dir(Path::new("/home/dev"), &config.project_root, corpus.as_deref()),
            PathBuf::from("/srv/proj/tests/verify")
        );
        assert_eq!(
            corpus_dir(
                Path::new("/home/dev"),
                &config.project_root,
                Some(Path::new("cases"))
            ),
            PathBuf::from("/home/dev/cases")
        );
    }
}
