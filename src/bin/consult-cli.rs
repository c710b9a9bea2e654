use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "consult-cli")]
#[command(about = "Command-line client for the consultation gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    /// API key sent as `x-api-key` on write requests.
    #[arg(short, long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway health
    Health,
    /// List stored consultations
    Consultations,
    /// Submit a consultation from a JSON file
    Submit {
        /// File holding `{"name", "email", "company"?, "message"}`
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert("x-agent-type", HeaderValue::from_static("consult-cli"));
    if let Some(key) = &cli.key {
        headers.insert("x-api-key", HeaderValue::from_str(key)?);
    }

    let res = match cli.command {
        Commands::Health => {
            client
                .get(format!("{base}/api/health"))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Consultations => {
            client
                .get(format!("{base}/api/consultations"))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Submit { file } => {
            let body: Value = serde_json::from_str(&std::fs::read_to_string(&file)?)?;
            client
                .post(format!("{base}/api/consultations"))
                .headers(headers)
                .json(&body)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
