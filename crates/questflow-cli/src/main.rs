#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use questflow_observability::{init_tracing, LoggingConfig};

mod commands;
mod env_ports;

use commands::{article, company};

/// QuestFlow CLI - run the article and company content pipelines
#[derive(Parser)]
#[command(name = "questflow")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run the QuestFlow article and company content pipelines", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the topic → article pipeline once.
    Article(article::ArticleArgs),
    /// Run the URL → company profile pipeline once.
    Company(company::CompanyArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(LoggingConfig::new("questflow-cli"))?;

    let cli = Cli::parse();
    let ports = env_ports::build_ports().await?;

    match cli.command {
        Commands::Article(args) => article::run(args, &ports).await,
        Commands::Company(args) => company::run(args, &ports).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clap_parses_article_subcommand() {
        let cli = Cli::try_parse_from(["questflow", "article", "Digital Nomad Visa Greece"]).unwrap();
        assert!(matches!(cli.command, Commands::Article(_)));
    }

    #[test]
    fn clap_parses_company_subcommand() {
        let cli = Cli::try_parse_from([
            "questflow",
            "company",
            "https://example.com",
            "--category",
            "placement_agent",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Company(_)));
    }

    #[test]
    fn clap_rejects_missing_required_args() {
        assert!(Cli::try_parse_from(["questflow", "company"]).is_err());
    }
}
