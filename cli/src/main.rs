use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use common::{Granularity, PeriodKey, ReportFormat, ReportRequest};
use report::AnalysisConfig;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cost-report")]
struct Args {
    /// Client name used in the report title and filename.
    #[arg(long, short = 'c')]
    client: String,

    /// Months to report on, as YYYY-MM. Between 2 and 6.
    #[arg(long, short = 'm', required = true, num_args = 2..=6)]
    months: Vec<String>,

    /// Output format: xlsx or docx.
    #[arg(long, default_value = "xlsx")]
    format: String,

    /// Budget threshold to annotate the report with.
    #[arg(long)]
    budget: Option<f64>,

    /// Directory the report file is written into.
    #[arg(long, short = 'o', default_value = ".")]
    output: PathBuf,

    #[arg(long, default_value = "config")]
    config_file: String,
}

#[derive(Deserialize, Default)]
struct CliConfig {
    #[serde(default)]
    analysis: AnalysisConfig,
}

fn load_config(config_file: &str) -> Result<CliConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(config_file).required(false))
        .add_source(config::Environment::default())
        .build()?;
    let cfg: CliConfig = settings.try_deserialize()?;
    Ok(cfg)
}

fn parse_format(s: &str) -> Result<ReportFormat> {
    match s {
        "xlsx" => Ok(ReportFormat::Spreadsheet),
        "docx" => Ok(ReportFormat::Document),
        other => anyhow::bail!("unsupported format '{other}', expected xlsx or docx"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("cli=info"));

    let args = Args::parse();
    let cfg = load_config(&args.config_file)?;

    let mut periods = args
        .months
        .iter()
        .map(|m| m.parse::<PeriodKey>().map_err(anyhow::Error::msg))
        .collect::<Result<Vec<_>>>()?;
    periods.sort();

    let request = ReportRequest {
        client: args.client,
        periods,
        granularity: Granularity::Service,
        format: parse_format(&args.format)?,
        budget: args.budget.map(|threshold| common::BudgetContext {
            threshold,
            breach_date: None,
            baseline: None,
            current: None,
        }),
    };
    report::validate_request(&request)?;

    log::info!(
        "Fetching cost data for {} months ({} to {})",
        request.periods.len(),
        request.periods[0],
        request.periods[request.periods.len() - 1]
    );

    let ce_client = ce::new_client().await;
    let data = ce::get_cost_data(&ce_client, &request.periods).await?;
    log::info!(
        "Fetched {} service rows and {} region rows",
        data.records.len(),
        data.regional.len()
    );

    let artifact = report::build_report(&request, &data, &cfg.analysis, Utc::now())?;

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating output directory {}", args.output.display()))?;
    let path = args.output.join(&artifact.filename);
    std::fs::write(&path, &artifact.bytes)
        .with_context(|| format!("writing {}", path.display()))?;

    log::info!("Wrote {} ({} bytes)", path.display(), artifact.bytes.len());

    Ok(())
}
