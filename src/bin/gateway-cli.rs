use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Client for the rpc-gateway config API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current configuration
    Get,
    /// Apply a partial configuration update
    Update {
        #[arg(long)]
        http_compression: Option<bool>,
        #[arg(long)]
        https: Option<bool>,
        #[arg(long)]
        enable_rate_limitor: Option<bool>,
        #[arg(long)]
        num_token_max: Option<u32>,
        #[arg(long)]
        num_token_per_sec: Option<u32>,
    },
    /// List blacklisted IPs
    Iplist,
    /// Add IPs to the blacklist
    Block { ips: Vec<String> },
    /// Remove IPs from the blacklist
    Unblock { ips: Vec<String> },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Get => client.get(format!("{base}/config")).send().await?,
        Commands::Update {
            http_compression,
            https,
            enable_rate_limitor,
            num_token_max,
            num_token_per_sec,
        } => {
            let mut body = serde_json::Map::new();
            let fields = [
                ("httpCompression", http_compression.map(Value::from)),
                ("https", https.map(Value::from)),
                ("enableRateLimitor", enable_rate_limitor.map(Value::from)),
                ("numTokenMax", num_token_max.map(Value::from)),
                ("numTokenPerSec", num_token_per_sec.map(Value::from)),
            ];
            for (name, value) in fields {
                if let Some(value) = value {
                    body.insert(name.to_string(), value);
                }
            }
            client
                .post(format!("{base}/config:update"))
                .json(&Value::Object(body))
                .send()
                .await?
        }
        Commands::Iplist => client.get(format!("{base}/config/iplist")).send().await?,
        Commands::Block { ips } => {
            client
                .post(format!("{base}/config/iplist:update"))
                .json(&json!({ "action": "ACTION_TYPE_ADD", "ipList": ips }))
                .send()
                .await?
        }
        Commands::Unblock { ips } => {
            client
                .post(format!("{base}/config/iplist:update"))
                .json(&json!({ "action": "ACTION_TYPE_REMOVE", "ipList": ips }))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
