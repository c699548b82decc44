use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Inspect a running zeroscale-gateway through its admin port", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:9091")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check liveness and readiness
    Health,
    /// Per-route concurrency and RPS as reported to the autoscaler
    Queue,
    /// DNS cache and forwarding counters
    Stats,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Health => {
            for probe in ["livez", "readyz"] {
                let res = client.get(format!("{}/{}", cli.url, probe)).send().await?;
                println!("{}: {}", probe, res.status());
            }
        }
        Commands::Queue => {
            let res = client.get(format!("{}/queue", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Stats => {
            let res = client.get(format!("{}/debug/stats", cli.url)).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
