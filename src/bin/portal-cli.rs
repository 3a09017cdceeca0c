use clap::{Parser, Subcommand};
use serde_json::Value;

use portal_proxy::client::{ApiClient, ApiError, ApiResponse, ClientConfig};
use portal_proxy::proxy::Payload;

#[derive(Parser)]
#[command(name = "portal-cli")]
#[command(about = "Call the portal data API through the local proxy", long_about = None)]
struct Cli {
    /// Origin of the local site serving the proxy.
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    url: String,

    /// Local proxy root.
    #[arg(long, default_value = "/_api")]
    proxy_root: String,

    /// Local token endpoint.
    #[arg(long, default_value = "/_layouts/tokenhtml")]
    token_path: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch an anti-forgery token and print it
    Token,
    /// Read a collection or record, e.g. `get "accounts?$top=5"`
    Get { path: String },
    /// Create a record from a JSON body
    Create { path: String, body: String },
    /// Update a record (PATCH) from a JSON body
    Update { path: String, body: String },
    /// Delete a record
    Delete { path: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = ApiClient::new(&ClientConfig {
        site_url: cli.url,
        proxy_root: cli.proxy_root,
        token_path: cli.token_path,
        ..ClientConfig::default()
    })?;

    let result = match cli.command {
        Commands::Token => {
            let token = client.tokens().acquire_token().await?;
            println!("{}", token.as_str());
            return Ok(());
        }
        Commands::Get { path } => client.get(&path).await,
        Commands::Create { path, body } => client.create(&path, &parse_body(&body)?).await,
        Commands::Update { path, body } => client.update(&path, &parse_body(&body)?).await,
        Commands::Delete { path } => client.delete(&path).await,
    };

    match result {
        Ok(response) => print_response(&response)?,
        Err(ApiError::NotAuthenticated) => {
            eprintln!("Error: session expired, sign in again");
            std::process::exit(2);
        }
        Err(ApiError::UpstreamError { status, payload }) => {
            eprintln!("Error: upstream returned status {}", status);
            eprintln!("{}", render(&payload)?);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

fn parse_body(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(text)
}

fn print_response(response: &ApiResponse) -> Result<(), serde_json::Error> {
    eprintln!("Status: {}", response.status);
    if let Some(id) = response.record_id() {
        eprintln!("Record: {}", id);
    }
    if !response.payload.is_empty() {
        println!("{}", render(&response.payload)?);
    }
    Ok(())
}

fn render(payload: &Payload) -> Result<String, serde_json::Error> {
    match payload {
        Payload::Structured(value) => serde_json::to_string_pretty(value),
        Payload::Raw(bytes) => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}
