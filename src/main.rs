use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use s3_static_website::config::SiteConfig;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn run(config_file: Option<&Path>) -> Result<()> {
    let conf = SiteConfig::load(config_file).context("failed to load site configuration")?;
    let doc = s3_static_website::evaluate(&conf).context("failed to evaluate the site")?;

    let json = serde_json::to_string_pretty(&doc)?;
    std::fs::write(&conf.output_path, json)
        .with_context(|| format!("failed to write stack document to {:?}", conf.output_path))?;
    info!(path = ?conf.output_path, resources = doc.resources.len(), "wrote stack document");

    for (name, value) in &doc.outputs {
        println!("{name}: {value}");
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: s3_static_website [CONFIG_PATH]");
        return ExitCode::FAILURE;
    }
    let config_file = args.get(1).map(Path::new);

    if let Err(err) = run(config_file) {
        error!("error: {err}");
        for cause in err.chain().skip(1) {
            error!("cause: {cause}");
        }
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
