//! Workbench CLI - apply a CSV to an Islandora repository
//!
//! ```bash
//! workbench --config create.yml            # Run the configured task
//! workbench --config create.yml --check    # Validate config and CSV only
//! ```
//!
//! The task (create, update, delete, add_media), host, credentials and input
//! location all come from the YAML configuration file.

use clap::Parser;
use std::path::PathBuf;
use workbench::{
    check_input, logging, logs, parse_csv_file, run_task, Config, DrupalClient, WorkbenchError,
};

#[derive(Parser)]
#[command(name = "workbench")]
#[command(about = "Batch create, update and delete Islandora content from CSV", long_about = None)]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(long, value_name = "PATH")]
    config: PathBuf,

    /// Check configuration and input data without changing anything
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), WorkbenchError> {
    let config = Config::load(&cli.config)?;
    logging::init_logging(&logging::LogConfig::from_config(&config))?;
    tracing::info!(
        task = config.task.as_str(),
        host = %config.host,
        check = cli.check,
        "workbench started"
    );

    let client = DrupalClient::new(&config)?;

    let csv_path = config.input_csv_path();
    logs::log_info(format!("📄 Reading {}", csv_path.display()));
    let input = parse_csv_file(&csv_path, config.delimiter_byte(), &config.subdelimiter)?;
    logs::log_info(format!(
        "Encoding: {}, columns: {}, rows: {}",
        input.encoding,
        input.headers.join(", "),
        input.rows.len() + input.rejected.len()
    ));

    if cli.check {
        let report = check_input(&client, &config, &input).await;
        report.emit();
        if !report.is_ok() {
            return Err(WorkbenchError::CheckFailed(report.errors.len()));
        }
        return Ok(());
    }

    let summary = run_task(&client, &config, input).await?;
    println!("\n✨ {}", summary);
    Ok(())
}
