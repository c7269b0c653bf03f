//! certsuite CLI - run compliance checks and verify their results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use certsuite_core::duration::parse_duration;
use certsuite_core::{TestEnvironment, DEFAULT_TEMPLATE_FILE};
use certsuite_engine::{LabelFilter, RunConfig, RunReport, Runner, SIGNAL_ABORT_REASON};
use certsuite_report::failures::{self, OutputFormat};
use certsuite_report::{generate_template, parse_log_results, render_failed_logs, render_summary, verify, ClaimBuilder};
use certsuite_storage::{ArtifactStore, JsonStorage};

const DEFAULT_LOG_FILE: &str = "certsuite.log";

#[derive(Parser)]
#[command(name = "certsuite")]
#[command(about = "Compliance check orchestration and reporting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the selected checks against an environment snapshot
    Run {
        /// Label expression selecting the checks
        #[arg(short, long, default_value = "none")]
        label_filter: String,
        /// Global time budget (e.g. 30m, 1h30m)
        #[arg(long, default_value = "24h")]
        timeout: String,
        /// Environment snapshot (JSON)
        #[arg(long)]
        environment: PathBuf,
        /// Directory receiving the claim
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
        /// Run log; defaults to certsuite.log in the output directory
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// List the checks a label expression selects
    Info {
        /// Label expression selecting the checks
        #[arg(short, long, default_value = "all")]
        label_filter: String,
    },
    /// Verify run results
    Check {
        #[command(subcommand)]
        command: CheckCommands,
    },
    /// Inspect a claim
    Claim {
        #[command(subcommand)]
        command: ClaimCommands,
    },
}

#[derive(Subcommand)]
enum CheckCommands {
    /// Compare a run log with an expected-results template
    Results {
        /// Expected-results template
        #[arg(long, default_value = DEFAULT_TEMPLATE_FILE, conflicts_with = "generate_template")]
        template: PathBuf,
        /// Run log to scan
        #[arg(long, default_value = DEFAULT_LOG_FILE)]
        log_file: PathBuf,
        /// Write a template from the log instead of verifying
        #[arg(long)]
        generate_template: bool,
    },
}

#[derive(Subcommand)]
enum ClaimCommands {
    /// List failed checks and their non-compliant objects
    Failures {
        /// Claim file
        #[arg(long)]
        claim: PathBuf,
        /// Only these suites
        #[arg(long, value_delimiter = ',')]
        suites: Vec<String>,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        output: Format,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            label_filter,
            timeout,
            environment,
            output_dir,
            log_file,
        } => {
            let log_file = log_file.unwrap_or_else(|| output_dir.join(DEFAULT_LOG_FILE));
            let (inputs, log) = prepare_run(&label_filter, &timeout, &log_file)?;
            init_logging(Some(log))?;
            let report = run(inputs, &environment, &output_dir).await?;
            Ok(run_exit_code(&report))
        }
        Commands::Info { label_filter } => {
            init_logging(None)?;
            show_info(&label_filter)
        }
        Commands::Check {
            command:
                CheckCommands::Results {
                    template,
                    log_file,
                    generate_template,
                },
        } => {
            init_logging(None)?;
            let code = check_results(Path::new("."), &template, &log_file, generate_template).await?;
            Ok(ExitCode::from(code))
        }
        Commands::Claim {
            command: ClaimCommands::Failures { claim, suites, output },
        } => {
            init_logging(None)?;
            claim_failures(&claim, &suites, output.into()).await
        }
    }
}

/// Log to stderr, and without colors to `log_file` when given.
fn init_logging(log_file: Option<File>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer =
        log_file.map(|file| fmt::layer().with_ansi(false).with_writer(Mutex::new(file)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

/// Validated `run` inputs, with the arguments kept as given for the claim.
struct RunInputs {
    label_filter: String,
    filter: LabelFilter,
    timeout_arg: String,
    timeout: Duration,
}

fn parse_run_inputs(label_filter: &str, timeout: &str) -> Result<RunInputs> {
    let filter = LabelFilter::parse(label_filter)
        .with_context(|| format!("invalid label filter {:?}", label_filter))?;
    let parsed =
        parse_duration(timeout).with_context(|| format!("invalid timeout {:?}", timeout))?;
    Ok(RunInputs {
        label_filter: label_filter.to_string(),
        filter,
        timeout_arg: timeout.to_string(),
        timeout: parsed,
    })
}

/// Validate the arguments, then create the log file. Nothing touches the
/// filesystem when an argument is rejected.
fn prepare_run(label_filter: &str, timeout: &str, log_file: &Path) -> Result<(RunInputs, File)> {
    let inputs = parse_run_inputs(label_filter, timeout)?;
    if let Some(dir) = log_file.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating log directory {}", dir.display()))?;
    }
    let file = File::create(log_file)
        .with_context(|| format!("creating log file {}", log_file.display()))?;
    Ok((inputs, file))
}

async fn run(inputs: RunInputs, environment: &Path, output_dir: &Path) -> Result<RunReport> {
    let catalog = certsuite_suites::build_catalog().context("building check catalog")?;
    let storage = JsonStorage::new(output_dir)
        .await
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;

    let snapshot = storage
        .load_environment(environment)
        .await
        .with_context(|| format!("loading environment {}", environment.display()))?;
    let mut env = TestEnvironment::with_source(snapshot, environment);

    let config = RunConfig::new()
        .with_filter(inputs.filter)
        .with_timeout(inputs.timeout);
    let runner = Runner::new(config).with_groups(certsuite_suites::load_groups(&catalog));

    let token = runner.abort_token();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() && token.abort(SIGNAL_ABORT_REASON) {
            warn!("Interrupted, finishing the current check");
        }
    });

    let report = tokio::task::spawn_blocking(move || runner.run(&mut env))
        .await
        .context("check runner panicked")?;
    signal.abort();

    let claim = ClaimBuilder::new(&catalog)
        .with_label_filter(inputs.label_filter)
        .with_timeout(inputs.timeout_arg)
        .build(&report);
    let claim_path = storage.save_claim(&claim).await.context("writing claim")?;
    info!("Claim written to {}", claim_path.display());

    print!("{}", render_summary(&report));
    print!("{}", render_failed_logs(&report.outcomes));

    Ok(report)
}

fn run_exit_code(report: &RunReport) -> ExitCode {
    if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn show_info(label_filter: &str) -> Result<ExitCode> {
    let filter = LabelFilter::parse(label_filter)
        .with_context(|| format!("invalid label filter {:?}", label_filter))?;
    let catalog = certsuite_suites::build_catalog().context("building check catalog")?;
    let runner = Runner::new(RunConfig::new().with_filter(filter))
        .with_groups(certsuite_suites::load_groups(&catalog));

    let selected = runner.selected();
    if selected.is_empty() {
        println!("No checks match {:?}", label_filter);
        return Ok(ExitCode::SUCCESS);
    }

    for (suite, check) in selected {
        let description = catalog
            .lookup(suite, check.id())
            .map(|e| e.description.as_str())
            .unwrap_or_default();
        println!("{} ({})", check.id(), suite);
        println!("  Tags: {}", check.tags().join(", "));
        if !description.is_empty() {
            println!("  {}", description);
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Returns the process exit code. A generated template lands in `root`.
async fn check_results(root: &Path, template: &Path, log_file: &Path, generate: bool) -> Result<u8> {
    let storage = JsonStorage::new(root).await?;
    let log = storage
        .read_log(log_file)
        .await
        .with_context(|| format!("reading log {}", log_file.display()))?;

    if generate {
        let actual = parse_log_results(&log)?;
        let generated = generate_template(&actual)?;
        let path = storage.save_template(&generated).await.context("writing template")?;
        println!("Template with {} test cases written to {}", generated.len(), path.display());
        return Ok(0);
    }

    let expected = storage
        .load_template(template)
        .await
        .with_context(|| format!("reading template {}", template.display()))?;
    let verification = verify(&log, &expected)?;
    print!("{}", verification.render());
    Ok(verification.exit_code())
}

async fn claim_failures(claim: &Path, suites: &[String], format: OutputFormat) -> Result<ExitCode> {
    let storage = JsonStorage::new(".").await?;
    let root = storage
        .load_claim(claim)
        .await
        .with_context(|| format!("reading claim {}", claim.display()))?;

    let failed = failures::collect_failures(&root.claim, suites)?;
    println!("{}", failures::render(&failed, format)?.trim_end());
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use certsuite_core::{TestCaseList, TestResultsTemplate};
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["certsuite", "run", "--environment", "env.json"]).unwrap();
        match cli.command {
            Commands::Run {
                label_filter,
                timeout,
                output_dir,
                log_file,
                ..
            } => {
                assert_eq!(label_filter, "none");
                assert_eq!(timeout, "24h");
                assert_eq!(output_dir, PathBuf::from("."));
                assert!(log_file.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_template_conflicts_with_generate() {
        let parsed = Cli::try_parse_from([
            "certsuite",
            "check",
            "results",
            "--template",
            "t.yaml",
            "--generate-template",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_failures_suites_split_on_comma() {
        let cli = Cli::try_parse_from([
            "certsuite",
            "claim",
            "failures",
            "--claim",
            "claim.json",
            "--suites",
            "networking,observability",
            "--output",
            "json",
        ])
        .unwrap();
        match cli.command {
            Commands::Claim {
                command: ClaimCommands::Failures { suites, output, .. },
            } => {
                assert_eq!(suites, vec!["networking", "observability"]);
                assert_eq!(output, Format::Json);
            }
            _ => panic!("expected claim failures"),
        }
    }

    #[test]
    fn test_parse_run_inputs_rejects_bad_values() {
        assert!(parse_run_inputs("telco &&", "1h").is_err());
        assert!(parse_run_inputs("telco", "soon").is_err());

        let inputs = parse_run_inputs("telco", "1h30m").unwrap();
        assert_eq!(inputs.timeout, Duration::from_secs(5400));
    }

    #[test]
    fn test_bad_run_arguments_create_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let log = out.join(DEFAULT_LOG_FILE);

        assert!(prepare_run("telco &&", "1h", &log).is_err());
        assert!(prepare_run("telco", "soon", &log).is_err());
        assert!(!out.exists());

        prepare_run("telco", "1h", &log).unwrap();
        assert!(log.exists());
    }

    #[tokio::test]
    async fn test_run_writes_claim() {
        let dir = tempfile::tempdir().unwrap();
        let env_path = dir.path().join("env.json");
        std::fs::write(&env_path, r#"{"namespaces": ["ns1"]}"#).unwrap();
        let out = dir.path().join("out");

        let inputs = parse_run_inputs("networking", "1.5s").unwrap();
        let report = run(inputs, &env_path, &out).await.unwrap();
        assert_eq!(report.outcomes.len(), 1);
        assert!(report.has_failures());

        let storage = JsonStorage::new(&out).await.unwrap();
        let root = storage
            .load_claim(&out.join(certsuite_storage::CLAIM_FILE))
            .await
            .unwrap();
        assert_eq!(root.claim.metadata.label_filter, "networking");
        assert_eq!(root.claim.metadata.timeout, "1.5s");
    }

    #[tokio::test]
    async fn test_check_results_exit_codes() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join(DEFAULT_LOG_FILE);
        std::fs::write(
            &log_path,
            "INFO [network-policy-deny-all] Recording result \"FAILED\"\n\
             INFO [container-logging] Recording result \"PASSED\"\n",
        )
        .unwrap();

        let storage = JsonStorage::new(dir.path()).await.unwrap();
        let wrong = TestResultsTemplate {
            test_cases: TestCaseList {
                pass: vec!["network-policy-deny-all".to_string(), "container-logging".to_string()],
                ..Default::default()
            },
        };
        let wrong_path = storage.save_template(&wrong).await.unwrap();
        let code = check_results(dir.path(), &wrong_path, &log_path, false).await.unwrap();
        assert_eq!(code, 1);

        std::fs::remove_file(&wrong_path).unwrap();
        let code = check_results(dir.path(), Path::new("unused.yaml"), &log_path, true)
            .await
            .unwrap();
        assert_eq!(code, 0);

        let generated = dir.path().join(DEFAULT_TEMPLATE_FILE);
        let template = storage.load_template(&generated).await.unwrap();
        assert_eq!(template.test_cases.fail, vec!["network-policy-deny-all"]);
        assert_eq!(template.test_cases.pass, vec!["container-logging"]);

        let code = check_results(dir.path(), &generated, &log_path, false).await.unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_check_results_missing_log_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.log");
        let err = check_results(dir.path(), Path::new("t.yaml"), &missing, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("reading log"));
    }
}
