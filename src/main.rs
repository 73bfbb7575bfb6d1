//! Command-line interface for the PDF tampering detection engine.

use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Arg, ArgAction, Command};
use parking_lot::Mutex;
use pdfsleuth::config::AnalysisConfig;
use pdfsleuth::engine::{DetectionEngine, ProgressCallback, ProgressUpdate};
use pdfsleuth::report;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();

    let verbose = matches.get_flag("verbose");
    let quiet = matches.get_flag("quiet");
    init_logging(verbose, quiet);

    let original = PathBuf::from(matches.get_one::<String>("original").unwrap());
    let comparison = matches.get_one::<String>("comparison").map(PathBuf::from);
    let report_path = matches.get_one::<String>("report");
    let format = matches.get_one::<String>("format").unwrap();

    if !original.exists() {
        error!("original file does not exist: {}", original.display());
        process::exit(2);
    }
    if let Some(path) = &comparison {
        if !path.exists() {
            error!("comparison file does not exist: {}", path.display());
            process::exit(2);
        }
    }

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => match load_config_file(path) {
            Ok(config) => config,
            Err(message) => {
                error!("failed to load config file: {}", message);
                process::exit(2);
            }
        },
        None => AnalysisConfig::default(),
    };
    if matches.get_flag("no-external-tools") {
        config.enable_external_tools = false;
    }
    if let Some(dpi) = matches.get_one::<u32>("dpi") {
        config.render_dpi = *dpi;
    }

    let engine = match DetectionEngine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("invalid configuration: {}", e);
            process::exit(2);
        }
    };

    let progress = (!quiet).then(progress_printer);

    info!("analyzing {}", original.display());
    let result = engine
        .run(&original, comparison.as_deref(), progress, None)
        .await;

    let detection = match result {
        Ok(detection) => detection,
        Err(e) => {
            error!("analysis failed: {}", e);
            process::exit(1);
        }
    };

    let rendered = match format.as_str() {
        "json" => match report::to_json_string(&detection) {
            Ok(json) => json,
            Err(e) => {
                error!("report serialization failed: {}", e);
                process::exit(1);
            }
        },
        _ => report::render_text(&detection),
    };

    match report_path {
        Some(path) => {
            if let Err(e) = fs::write(path, &rendered) {
                error!("failed to write report to {}: {}", path, e);
                process::exit(1);
            }
            info!("report written to {}", path);
        }
        None => println!("{}", rendered),
    }

    // Non-zero exit when the document looks tampered, for scripting
    if detection.risk_score >= 70.0 {
        process::exit(3);
    }
}

fn build_cli() -> Command {
    Command::new("pdfsleuth")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Forensic PDF comparison and tampering detection")
        .arg(
            Arg::new("original")
                .short('o')
                .long("original")
                .value_name("FILE")
                .help("Original (reference) PDF file")
                .required(true),
        )
        .arg(
            Arg::new("comparison")
                .short('c')
                .long("comparison")
                .value_name("FILE")
                .help("Candidate PDF to compare against the original; omit to inspect a single file"),
        )
        .arg(
            Arg::new("report")
                .short('r')
                .long("report")
                .value_name("FILE")
                .help("Write the report to this path instead of stdout"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .value_parser(["json", "text"])
                .default_value("text")
                .help("Report output format"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("Configuration file (JSON or YAML)"),
        )
        .arg(
            Arg::new("dpi")
                .long("dpi")
                .value_name("DPI")
                .value_parser(clap::value_parser!(u32))
                .help("Raster resolution for visual comparison"),
        )
        .arg(
            Arg::new("no-external-tools")
                .long("no-external-tools")
                .action(ArgAction::SetTrue)
                .help("Skip external tool probing and invocation"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Verbose logging"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose")
                .help("Log errors only and suppress the progress display"),
        )
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(format!("pdfsleuth={}", level)))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("logging already initialized");
    }
}

fn load_config_file(path: &str) -> Result<AnalysisConfig, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path, e))?;

    // Try JSON first, then YAML
    serde_json::from_str(&content)
        .or_else(|_| serde_yaml::from_str(&content))
        .map_err(|e| format!("config parsing error: {}", e))
}

fn progress_printer() -> ProgressCallback {
    Arc::new(Mutex::new(Box::new(|update: ProgressUpdate| {
        info!(
            "[{:>3.0}%] {}",
            update.fraction * 100.0,
            update.stage
        );
    })))
}
