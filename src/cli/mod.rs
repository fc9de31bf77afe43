pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "sims")]
#[command(about = "SIMS CLI - maintenance and tooling for the SIMS API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply database migrations")]
    Migrate,

    #[command(about = "Print a Postman collection for the scheme routes")]
    Postman {
        #[arg(long, help = "Base URL stored in the collection's baseUrl variable")]
        base_url: Option<String>,
        #[arg(long, value_delimiter = ',', help = "Comma separated models to include (default: all)")]
        models: Vec<String>,
        #[arg(long, help = "Collection name")]
        name: Option<String>,
    },

    #[command(about = "Print the CSV import header for a model")]
    CsvTemplate {
        #[arg(help = "Model name, e.g. item")]
        model: String,
    },

    #[command(about = "Check the /health endpoint of a running server")]
    Ping {
        #[arg(long, help = "Server base URL (default: http://localhost:<SIMS_API_PORT>)")]
        url: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::Postman { base_url, models, name } => {
            commands::postman::handle(base_url, models, name, output_format).await
        }
        Commands::CsvTemplate { model } => commands::csv_template::handle(&model, output_format).await,
        Commands::Ping { url } => commands::ping::handle(url, output_format).await,
    }
}
