pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::{config, AppConfig};
use crate::database::Backend;

#[derive(Parser)]
#[command(name = "polaris")]
#[command(about = "Polaris CLI - load, search and edit the product table")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, value_name = "PATH", help = "SQLite file to operate on (overrides POLARIS_DB_PATH)")]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Replace the product table with a CSV file")]
    Load {
        #[arg(help = "Path of the CSV file")]
        csv: String,
    },

    #[command(about = "List products, optionally filtered")]
    List {
        #[arg(long, help = "Substring of the title")]
        title: Option<String>,
        #[arg(long, help = "High, Medium, Low or All")]
        visibility: Option<String>,
        #[arg(long = "where", value_name = "JSON", help = "JSON filter, e.g. '{\"InStock\": 1}'")]
        where_clause: Option<String>,
        #[arg(long, help = "Maximum number of rows")]
        limit: Option<i64>,
    },

    #[command(about = "Show one product")]
    Get {
        #[arg(help = "Record id")]
        id: i64,
    },

    #[command(about = "Create a product from a JSON object on stdin")]
    Create,

    #[command(about = "Update a product from a JSON object on stdin")]
    Update {
        #[arg(help = "Record id")]
        id: i64,
    },

    #[command(about = "Delete a product")]
    Delete {
        #[arg(help = "Record id")]
        id: i64,
    },

    #[command(about = "Show the operations log, newest first")]
    Ops {
        #[arg(long, help = "Maximum number of entries")]
        limit: Option<i64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json && !cli.text {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    let mut app_config: AppConfig = config().clone();
    if let Some(db) = cli.db {
        app_config.store.path = db;
    }
    let backend = Backend::open(&app_config).await?;

    let result = match cli.command {
        Commands::Load { csv } => commands::load::handle(&backend, &csv, &output_format).await,
        Commands::List { title, visibility, where_clause, limit } => {
            let args = commands::data::ListArgs { title, visibility, where_clause, limit };
            commands::data::list(&backend, args, &output_format).await
        }
        Commands::Get { id } => commands::data::get(&backend, id, &output_format).await,
        Commands::Create => commands::data::create(&backend, &output_format).await,
        Commands::Update { id } => commands::data::update(&backend, id, &output_format).await,
        Commands::Delete { id } => commands::data::delete(&backend, id, &output_format).await,
        Commands::Ops { limit } => commands::ops::handle(&backend, limit, &output_format).await,
    };

    backend.store().close().await;
    result
}
