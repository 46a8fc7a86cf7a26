use adlift::{
    analysis::run_analysis,
    cli::{Cli, OutputFormat},
    config::AnalysisConfig,
    dataset::CampaignTable,
    html_report::HtmlReport,
};
use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Load the config file if given, then apply command-line overrides
fn load_config(args: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::default(),
    };
    args.apply_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = load_config(&args)?;
    tracing::debug!("Configuration: {:?}", config);

    let mut table = CampaignTable::from_path(&args.input)?;
    let report = run_analysis(&mut table, &config)?;

    match args.format {
        OutputFormat::Text => print!("{}", report.to_report_string()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if let Some(path) = &args.html {
        let source = args
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| args.input.display().to_string());
        std::fs::write(path, HtmlReport::new(&report, &source).to_html())
            .with_context(|| format!("Failed to write HTML report {}", path.display()))?;
        tracing::info!("HTML report written to {}", path.display());
    }

    Ok(())
}
