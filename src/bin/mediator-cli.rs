use std::path::PathBuf;
use clap::{Parser, Subcommand};
use serde_json::json;
use url::Url;

use attestation_mediator::config::{load_config, MediatorConfig};
use attestation_mediator::mediation::MediationStore;
use attestation_mediator::observability::init_logging;

#[derive(Parser)]
#[command(name = "mediator-cli")]
#[command(about = "Validate and inspect attestation mediation rules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a config file
    Validate { file: PathBuf },
    /// Show which rules of a config file apply to a URL
    Inspect {
        file: PathBuf,
        url: String,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { file } => {
            let config = load_config(&file)?;
            init_logging(&config.logging)?;
            print_summary(&config);
        }
        Commands::Inspect { file, url, json } => {
            let config = load_config(&file)?;
            init_logging(&config.logging)?;
            let url = Url::parse(&url)?;
            let report = inspect(&config, &url);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
    }

    Ok(())
}

fn print_summary(config: &MediatorConfig) {
    println!("Configuration OK");
    println!(
        "  attestation config: {}",
        if config.attestation.config.is_empty() { "not set" } else { "set" }
    );
    println!("  token header: {:?} prefix {:?}", config.token.header, config.token.prefix);
    if let Some(binding) = &config.rules.binding_header {
        println!("  binding header: {binding}");
    }
    println!(
        "  proceed on network failure: {}",
        config.rules.proceed_on_network_failure
    );
    println!(
        "  rules: {} substitution headers, {} query parameters, {} exclusions",
        config.rules.substitution_headers.len(),
        config.rules.substitution_query_params.len(),
        config.rules.exclusion_url_regexes.len()
    );
}

fn inspect(config: &MediatorConfig, url: &Url) -> serde_json::Value {
    let store = MediationStore::new();
    store.apply_rules(&config.token, &config.rules);
    let snapshot = store.snapshot();

    let query_params: Vec<_> = snapshot
        .substitution_query_params
        .iter()
        .filter_map(|(key, pattern)| {
            let caps = pattern.captures(url.as_str())?;
            Some(json!({ "param": key, "lookup_key": caps.get(1)?.as_str() }))
        })
        .collect();
    let headers: Vec<_> = snapshot
        .substitution_headers
        .iter()
        .map(|(header, prefix)| json!({ "header": header, "prefix": prefix }))
        .collect();

    json!({
        "url": url.as_str(),
        "https": url.scheme() == "https",
        "excluded_by": snapshot.excluded_by(url.as_str()),
        "token_header": snapshot.token_header.name,
        "query_param_matches": query_params,
        "header_rules": headers,
    })
}

fn print_report(report: &serde_json::Value) {
    println!("URL: {}", report["url"].as_str().unwrap_or_default());
    if report["https"] != json!(true) {
        println!("  not https: query parameters are never substituted");
    }
    match report["excluded_by"].as_str() {
        Some(pattern) => println!("  excluded by {pattern}: pinned only"),
        None => println!(
            "  token added on header {}",
            report["token_header"].as_str().unwrap_or_default()
        ),
    }
    for rule in report["query_param_matches"].as_array().into_iter().flatten() {
        println!(
            "  query parameter {} -> secure string {}",
            rule["param"].as_str().unwrap_or_default(),
            rule["lookup_key"].as_str().unwrap_or_default()
        );
    }
    for rule in report["header_rules"].as_array().into_iter().flatten() {
        println!(
            "  header {} with prefix {:?} is substituted when present",
            rule["header"].as_str().unwrap_or_default(),
            rule["prefix"].as_str().unwrap_or_default()
        );
    }
}
