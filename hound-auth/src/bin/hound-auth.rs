//! Credential manager for the hound gateway.
//!
//! Edits the credential file directly. A running gateway sees new and removed
//! clients on its next credential check. Once a client is revoked here the
//! gateway refuses its next refresh grant and drops its remaining tokens,
//! codes and sessions; an access token it already holds stays valid until it
//! expires (one hour by default).

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use env_logger::Env;
use hound_auth::{Clock, CredentialStore, SystemClock, DEFAULT_CREDENTIALS_FILE};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "hound-auth", version, about = "MCP-Hound credential manager")]
#[command(after_help = "Examples:
  hound-auth create \"Claude Code - Workstation\"
  hound-auth list
  hound-auth revoke mcp_abc123xyz")]
struct Cli {
    /// Path to the credentials file
    #[arg(long, env = "MCP_CREDENTIALS_FILE", default_value = DEFAULT_CREDENTIALS_FILE)]
    credentials_file: PathBuf,

    /// Timeout for credential file operations, in milliseconds
    #[arg(long, env = "MCP_CREDENTIALS_IO_TIMEOUT_MS", default_value_t = 2000)]
    io_timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new client credential
    Create {
        /// Display name; multiple words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    /// List all client credentials
    List,
    /// Revoke a client credential
    Revoke {
        client_id: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init_from_env(Env::default().default_filter_or("warn"));

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    let store = CredentialStore::new(&cli.credentials_file)
        .with_io_timeout(Duration::from_millis(cli.io_timeout_ms));

    match cli.command {
        Command::Create { name } => create(&store, &name.join(" ")).await,
        Command::List => list(&store).await,
        Command::Revoke { client_id } => revoke(&store, &client_id).await,
    }
}

async fn create(store: &CredentialStore, name: &str) -> ExitCode {
    if name.trim().is_empty() {
        eprintln!("Error: Client name is required");
        return ExitCode::FAILURE;
    }

    let client = match store.create(name, SystemClock.now()).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error creating client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("\n✓ Client created successfully\n");
    println!("Save these credentials - the secret cannot be recovered:\n");
    println!("  Client ID:     {}", client.client_id);
    println!("  Client Secret: {}", client.client_secret);
    println!("\nClaude Code configuration (~/.claude.json):\n");
    println!("{}", client_config_snippet(&client.client_id, &client.client_secret));
    println!();
    ExitCode::SUCCESS
}

async fn list(store: &CredentialStore) -> ExitCode {
    let clients = match store.list().await {
        Ok(clients) => clients,
        Err(e) => {
            eprintln!("Error listing clients: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if clients.is_empty() {
        println!("No clients configured.");
        return ExitCode::SUCCESS;
    }

    println!("\nConfigured clients:\n");
    println!("  {:<28} {:<30} Created", "Client ID", "Name");
    println!("  {}", "─".repeat(69));
    for client in clients {
        let name: String = client.name.chars().take(30).collect();
        println!(
            "  {:<28} {:<30} {}",
            client.client_id,
            name,
            client.created_at.format("%Y-%m-%d")
        );
    }
    println!();
    ExitCode::SUCCESS
}

async fn revoke(store: &CredentialStore, client_id: &str) -> ExitCode {
    match store.remove(client_id).await {
        Ok(true) => {
            println!("✓ Client {} revoked successfully", client_id);
            ExitCode::SUCCESS
        }
        Ok(false) => {
            eprintln!("Error: Client {} not found", client_id);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error revoking client: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn client_config_snippet(client_id: &str, client_secret: &str) -> String {
    let config = serde_json::json!({
        "mcpServers": {
            "hound": {
                "url": "https://your-mcp-hound-server.example.com/",
                "auth": {
                    "type": "oauth2",
                    "clientId": client_id,
                    "clientSecret": client_secret,
                    "tokenUrl": "https://your-mcp-hound-server.example.com/oauth/token"
                }
            }
        }
    });
    serde_json::to_string_pretty(&config).unwrap_or_default()
}
