use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use vulnrelay::{
    annotate::{annotate_findings, AnnotateOptions},
    config::Config,
    dedupe::dedupe_findings,
    model::Severity,
    output::{format_report_to_string, print_report, FindingsReport, OutputFormat},
    report::{default_extractor, SarifIngestor},
    tracker::SonarTracker,
};

/// Exit codes for CI integration
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
    pub const CRITICAL_VULN: u8 = 2;
    pub const HIGH_VULN: u8 = 3;
    pub const MEDIUM_VULN: u8 = 4;
    pub const LOW_VULN: u8 = 5;
}

#[derive(Parser)]
#[command(name = "vulnrelay")]
#[command(
    author,
    version,
    about = "Relay Trivy SARIF vulnerability findings to issue-tracker comments"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a SARIF report and print the deduplicated findings
    Findings {
        /// Path to the SARIF report file
        #[arg(short, long)]
        report: Option<String>,

        /// Output format (table, json)
        #[arg(short, long)]
        format: Option<String>,

        /// Write output to file
        #[arg(short, long)]
        output: Option<String>,

        /// Exit with an error code if findings at or above this severity
        /// remain
        #[arg(long, value_enum)]
        fail_on: Option<FailLevel>,
    },

    /// Parse a SARIF report and comment matching tracker issues
    Annotate {
        /// Path to the SARIF report file
        #[arg(short, long)]
        report: Option<String>,

        /// Base URL of the issue-tracker server
        #[arg(long)]
        server_url: Option<String>,

        /// Tracker login (username or token)
        #[arg(long)]
        login: Option<String>,

        /// Tracker password (blank for token auth)
        #[arg(long)]
        password: Option<String>,

        /// Rule repository issues are filed under
        #[arg(long)]
        rule_repository: Option<String>,

        /// Seconds to wait before the first issue search
        #[arg(long)]
        delay: Option<u64>,

        /// Build comments but do not post them
        #[arg(long)]
        dry_run: bool,

        /// Exit with an error code if findings at or above this severity
        /// remain
        #[arg(long, value_enum)]
        fail_on: Option<FailLevel>,
    },

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FailLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl FailLevel {
    fn threshold(self) -> Severity {
        match self {
            FailLevel::Critical => Severity::Critical,
            FailLevel::High => Severity::High,
            FailLevel::Medium => Severity::Medium,
            FailLevel::Low => Severity::Low,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vulnrelay=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<u8> {
    let cli = Cli::parse();
    let config = Config::load().unwrap_or_default();

    match cli.command {
        Commands::Findings {
            report,
            format,
            output,
            fail_on,
        } => {
            let report_path = report.unwrap_or_else(|| config.report_path.clone());
            let format_str = format.unwrap_or_else(|| config.default_format.clone());
            let format = OutputFormat::from_str(&format_str).map_err(|e| anyhow::anyhow!(e))?;

            let findings_report = load_findings(&report_path, &config);

            if let Some(path) = output {
                let content = format_report_to_string(&findings_report, format)?;
                std::fs::write(&path, content)?;
                println!("Results written to: {}", path);
            } else {
                print_report(&findings_report, format)?;
            }

            Ok(determine_exit_code(&findings_report, fail_on))
        }
        Commands::Annotate {
            report,
            server_url,
            login,
            password,
            rule_repository,
            delay,
            dry_run,
            fail_on,
        } => {
            let report_path = report.unwrap_or_else(|| config.report_path.clone());
            let findings_report = load_findings(&report_path, &config);

            let server_url = match server_url.or_else(|| config.server_url.clone()) {
                Some(url) => url,
                None => bail!("server URL is required (--server-url or config server_url)"),
            };
            let login = match login.or_else(|| config.login.clone()) {
                Some(login) => login,
                None => bail!("login is required (--login or config login)"),
            };
            let password = password.unwrap_or_else(|| config.password.clone());

            let options = AnnotateOptions {
                rule_repository: rule_repository
                    .unwrap_or_else(|| config.rule_repository.clone()),
                settle_delay: Duration::from_secs(
                    delay.unwrap_or(config.settle_delay_secs),
                ),
                dry_run,
            };

            let progress = ProgressBar::new_spinner();
            progress.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .unwrap(),
            );
            progress.enable_steady_tick(Duration::from_millis(100));
            progress.set_message("Annotating tracker issues...");

            let tracker = SonarTracker::new(server_url, login, password);
            let summary =
                annotate_findings(&findings_report.findings, &tracker, &options).await;

            progress.finish_with_message(format!(
                "Matched {} issues, posted {} comments ({} already annotated)",
                summary.matched_issues, summary.comments_posted, summary.skipped_existing
            ));

            Ok(determine_exit_code(&findings_report, fail_on))
        }
        Commands::Config { init, path } => {
            handle_config(init, path)?;
            Ok(exit_codes::SUCCESS)
        }
    }
}

/// Ingest, deduplicate, and filter a report into its canonical findings.
fn load_findings(report_path: &str, config: &Config) -> FindingsReport {
    let ingestor = SarifIngestor::new(default_extractor());
    let raw = ingestor.parse_file(Path::new(report_path));
    let mut findings = dedupe_findings(raw);
    findings.retain(|finding| !config.ignore.should_ignore(finding));
    FindingsReport::new(findings)
}

/// Determine the exit code based on the surviving findings and the
/// --fail-on setting.
fn determine_exit_code(report: &FindingsReport, fail_on: Option<FailLevel>) -> u8 {
    let fail_on = match fail_on {
        Some(level) => level,
        None => return exit_codes::SUCCESS,
    };

    let worst = match report.worst_severity() {
        Some(worst) => worst,
        None => return exit_codes::SUCCESS,
    };

    if worst < fail_on.threshold() {
        return exit_codes::SUCCESS;
    }

    match worst {
        Severity::Critical => exit_codes::CRITICAL_VULN,
        Severity::High => exit_codes::HIGH_VULN,
        Severity::Medium => exit_codes::MEDIUM_VULN,
        Severity::Low => exit_codes::LOW_VULN,
    }
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        let config = Config::default();
        config.save()?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    // Show current config
    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'vulnrelay config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
