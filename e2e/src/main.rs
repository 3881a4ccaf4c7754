use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fern::colors::{Color, ColoredLevelConfig};
use log::{error, info, warn, LevelFilter};
use lto_common::crypto::Account;
use lto_testing_integration::{
    run_suite,
    scenarios::load_feature,
    suite::{SuiteTest, VALIDATOR_SEED},
    wait_for_node, FileConfig, HarnessConfig, HttpNode, ScenarioContext, ScenarioRunner,
};

const DEFAULT_FEATURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/features");

/// LTO end-to-end test runner
#[derive(Parser, Debug)]
#[command(name = "lto-e2e")]
#[command(about = "Run end-to-end tests against an LTO public chain node")]
struct Cli {
    /// Node API base url
    #[clap(long, env = "LTO_NODE_URL")]
    node_url: Option<String>,

    /// Network chain id character (T for testnet, L for mainnet)
    #[clap(long, env = "LTO_CHAIN_ID")]
    chain_id: Option<char>,

    /// Seed of the account that funds the test accounts
    #[clap(long, env = "LTO_ROOT_SEED", hide_env_values = true)]
    root_seed: Option<String>,

    /// Set log level
    #[clap(long)]
    log_level: Option<String>,

    /// Also write the log to this file
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// Disable the usage of colors in log
    #[clap(long)]
    disable_log_color: bool,

    /// Write a JSON artifact for every failed scenario into this directory
    #[clap(long)]
    artifacts_dir: Option<PathBuf>,

    /// JSON File to load the configuration from
    #[clap(long)]
    config_file: Option<PathBuf>,

    /// Generate the template at the `config_file` path
    #[clap(long)]
    generate_config_template: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run feature files, or every .feature file in a directory
    Features {
        #[arg(default_value = DEFAULT_FEATURES_DIR)]
        paths: Vec<PathBuf>,
    },
    /// Run the fixed suite, all of it unless tests are named
    Suite { tests: Vec<SuiteTest> },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            if log::log_enabled!(log::Level::Error) {
                error!("{:#}", e);
            } else {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    if cli.generate_config_template {
        let path = cli
            .config_file
            .as_deref()
            .context("--generate-config-template needs --config-file")?;
        if path.exists() {
            bail!("config file already exists at {}", path.display());
        }
        HarnessConfig::generate_template(path)?;
        println!("Configuration template generated at {}", path.display());
        println!("Edit the file and run again with --config-file {}", path.display());
        return Ok(true);
    }

    let config = load_config(&cli)?;
    setup_logger(&config, cli.disable_log_color)?;
    info!("lto-e2e v{} against {}", env!("CARGO_PKG_VERSION"), config.node_url);

    let node = Arc::new(HttpNode::from_config(&config)?);
    wait_for_node(node.as_ref(), config.node_startup_timeout())
        .await
        .context("node is not reachable")?;

    let command = cli.command.unwrap_or(Command::Features {
        paths: vec![PathBuf::from(DEFAULT_FEATURES_DIR)],
    });

    match command {
        Command::Features { paths } => {
            let root = Account::from_seed(config.require_root_seed()?, config.chain_id_byte());
            let context = ScenarioContext::new(node, root, config.poll_config());
            let mut runner = ScenarioRunner::new(context)?;
            if let Some(dir) = &config.artifacts_dir {
                runner = runner.with_artifacts_dir(dir.clone());
            }

            let mut success = true;
            for file in collect_features(&paths).await? {
                let feature = load_feature(&file).await?;
                let report = runner.run_feature(&feature).await;
                report.print();
                success &= report.success();
            }
            Ok(success)
        }
        Command::Suite { tests } => {
            // the suite identities are funded at genesis, the validator holds the rest
            let seed = match config.require_root_seed() {
                Ok(seed) => seed,
                Err(_) => {
                    warn!("No root seed configured, using the validator account as root");
                    VALIDATOR_SEED
                }
            };
            let root = Account::from_seed(seed, config.chain_id_byte());
            let mut context = ScenarioContext::new(node, root, config.poll_config());

            let tests = if tests.is_empty() { SuiteTest::all() } else { tests };
            let report = run_suite(&mut context, &tests).await;
            report.print();
            Ok(report.success())
        }
    }
}

// A config file wins, environment and flags only fill the fields it leaves out
fn load_config(cli: &Cli) -> Result<HarnessConfig> {
    let file = cli.config_file.as_deref().map(FileConfig::load).transpose()?;
    let from_file = |field: &str| file.as_ref().is_some_and(|file| file.sets(field));
    let mut config = file
        .as_ref()
        .map(|file| file.config.clone())
        .unwrap_or_default();

    if let Some(node_url) = cli.node_url.as_ref().filter(|_| !from_file("node_url")) {
        config.node_url = node_url.clone();
    }
    if let Some(chain_id) = cli.chain_id.filter(|_| !from_file("chain_id")) {
        config.chain_id = chain_id;
    }
    if let Some(root_seed) = cli.root_seed.as_ref().filter(|_| !from_file("root_seed")) {
        config.root_seed = Some(root_seed.clone());
    }
    if let Some(log_level) = cli.log_level.as_ref().filter(|_| !from_file("log_level")) {
        config.log_level = log_level.clone();
    }
    if let Some(log_file) = cli.log_file.as_ref().filter(|_| !from_file("log_file")) {
        config.log_file = Some(log_file.clone());
    }
    if let Some(dir) = cli.artifacts_dir.as_ref().filter(|_| !from_file("artifacts_dir")) {
        config.artifacts_dir = Some(dir.clone());
    }

    config.validate()?;
    Ok(config)
}

fn setup_logger(config: &HarnessConfig, disable_colors: bool) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    let terminal = fern::Dispatch::new()
        .format(move |out, message, record| {
            let level = if disable_colors {
                record.level().to_string()
            } else {
                colors.color(record.level()).to_string()
            };
            out.finish(format_args!(
                "{} {:>5} [{}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                level,
                record.target(),
                message
            ))
        })
        .chain(std::io::stdout());

    let mut dispatch = fern::Dispatch::new()
        .level(config.level_filter()?)
        .level_for("reqwest", LevelFilter::Warn)
        .level_for("hyper_util", LevelFilter::Warn)
        .chain(terminal);

    if let Some(path) = &config.log_file {
        let file = fern::log_file(path)
            .with_context(|| format!("cannot open log file {}", path.display()))?;
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "{} {} [{}] {}",
                        chrono::Utc::now().to_rfc3339(),
                        record.level(),
                        record.target(),
                        message
                    ))
                })
                .chain(file),
        );
    }

    dispatch.apply().context("logger already initialized")?;
    Ok(())
}

// Expand directories into their .feature files, sorted by name
async fn collect_features(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("cannot read {}", path.display()))?;
        if !metadata.is_dir() {
            files.push(path.clone());
            continue;
        }

        let mut found = Vec::new();
        let mut entries = tokio::fs::read_dir(path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file = entry.path();
            if is_feature_file(&file) {
                found.push(file);
            }
        }
        found.sort();
        files.extend(found);
    }

    if files.is_empty() {
        bail!("no feature files found");
    }
    Ok(files)
}

fn is_feature_file(path: &Path) -> bool {
    path.extension().is_some_and(|extension| extension == "feature")
}
