use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use reqwest::Url;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, BufReader};

use faucet::api::{ApiError, FaucetApi, HttpFaucetApi};
use faucet::app::Faucet;
use faucet::auth::{AuthFlowError, ClientHandle, LoginOptions, PopupAuthorizer, create_client};
use faucet::claim::{ClaimCheckError, ClaimError};
use faucet::clock::to_hhmmss;
use faucet::config::{ConfigurationError, DEFAULT_BASE_URL, DEFAULT_STORAGE_PATH, FaucetConfig, LogoutStrategy};
use faucet::notify::LogNotifier;
use faucet::storage::{FileStorage, StorageError};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigurationError),
    #[error("{0}")]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("{0}")]
    Check(#[from] ClaimCheckError),
    #[error("{0}")]
    Claim(#[from] ClaimError),
    #[error("{0}")]
    Auth(#[from] AuthFlowError),
    #[error("not logged in; run `faucet login` first")]
    NotLoggedIn,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "faucet", about = "Faucet claim client")]
struct Cli {
    #[arg(long, env = "FAUCET_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, env = "FAUCET_STORAGE_PATH", default_value = DEFAULT_STORAGE_PATH)]
    storage_path: PathBuf,

    /// Backend session cookie, as `auth-session=<value>` or the bare value.
    #[arg(long, env = "FAUCET_SESSION_COOKIE")]
    session_cookie: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show claim eligibility for the remembered account.
    Status,
    /// Print the countdown until the next claim is allowed.
    Watch,
    /// Request tokens for an address.
    Claim { address: String },
    /// Show faucet backend info.
    Info,
    /// Log in through the OAuth provider.
    Login,
    /// End the session.
    Logout,
    /// Format seconds as HH:MM:SS.
    Hhmmss { secs: u64 },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = FaucetConfig::from_env()?;
    config.base_url = cli.base_url.trim_end_matches('/').to_owned();
    config.storage_path = cli.storage_path;
    if cli.session_cookie.is_some() {
        config.session_cookie = cli.session_cookie;
    }

    if let Command::Hhmmss { secs } = cli.command {
        println!("{}", to_hhmmss(secs));
        return Ok(());
    }

    let api = Arc::new(HttpFaucetApi::with_session(
        &config.base_url,
        config.timeouts,
        config.session_cookie.as_deref(),
    )?);
    let storage = Arc::new(FileStorage::open(&config.storage_path)?);
    let faucet = Faucet::new(api.clone(), Arc::new(LogNotifier), storage, config.logout);

    let result = match cli.command {
        Command::Status => run_status(&faucet).await,
        Command::Watch => run_watch(&faucet).await,
        Command::Claim { address } => run_claim(&faucet, &address).await,
        Command::Info => print_json(&api.info().await?),
        Command::Login => run_login(&faucet, &config).await,
        Command::Logout => run_logout(&faucet, &config).await,
        Command::Hhmmss { .. } => Ok(()),
    };
    faucet.shutdown();
    result
}

async fn run_status(faucet: &Faucet) -> Result<(), CliError> {
    let nickname = faucet.nickname().ok_or(CliError::NotLoggedIn)?;
    let status = faucet.refresh().await?.ok_or(CliError::NotLoggedIn)?;
    print_json(&json!({
        "github": nickname,
        "last_claim_time": status.last_claim_time,
        "next_eligible_time": status.next_eligible_time,
        "blocked": status.blocked,
        "remaining": to_hhmmss(status.remaining),
    }))
}

async fn run_watch(faucet: &Faucet) -> Result<(), CliError> {
    faucet.refresh().await?.ok_or(CliError::NotLoggedIn)?;
    if !faucet.countdown_active() {
        println!("claim available now");
        return Ok(());
    }

    let _printer = faucet.store().timer.subscribe(|timer: &String| {
        if !timer.is_empty() {
            println!("{timer}");
        }
    });
    let mut active = faucet.store().countdown_active.watch();
    tokio::select! {
        _ = active.wait_for(|active| !*active) => println!("claim available now"),
        _ = tokio::signal::ctrl_c() => eprintln!("interrupted"),
    }
    Ok(())
}

async fn run_claim(faucet: &Faucet, address: &str) -> Result<(), CliError> {
    let text = faucet.claim(address).await?;
    println!("{text}");
    Ok(())
}

async fn run_login(faucet: &Faucet, config: &FaucetConfig) -> Result<(), CliError> {
    let client = create_client(&config.auth, config.timeouts, Arc::new(TerminalPopup)).await?;
    let profile = faucet.login(&client, LoginOptions::github()).await?;
    print_json(&serde_json::to_value(&profile)?)
}

async fn run_logout(faucet: &Faucet, config: &FaucetConfig) -> Result<(), CliError> {
    let client = match config.logout {
        LogoutStrategy::Client => create_client(&config.auth, config.timeouts, Arc::new(TerminalPopup)).await?,
        LogoutStrategy::Redirect => ClientHandle::Absent,
    };
    faucet.logout(&client).await?;
    println!("logged out");
    Ok(())
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

// =============================================================================
// TERMINAL POPUP
// =============================================================================

/// Prints the authorization URL and reads the redirect back from stdin.
struct TerminalPopup;

#[async_trait::async_trait]
impl PopupAuthorizer for TerminalPopup {
    async fn authorize(&self, authorize_url: &str) -> Result<String, AuthFlowError> {
        eprintln!("open this URL in a browser and paste the redirect URL (or access token):");
        eprintln!("{authorize_url}");

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|_| AuthFlowError::Cancelled)?;
        parse_redirect(line.trim())
    }
}

fn parse_redirect(input: &str) -> Result<String, AuthFlowError> {
    if input.is_empty() {
        return Err(AuthFlowError::Cancelled);
    }
    let Some((_, fragment)) = input.split_once('#') else {
        return Ok(input.to_owned());
    };

    // The fragment uses query-string encoding; borrow the URL parser to decode it.
    let url = Url::parse(&format!("http://redirect.invalid/?{fragment}"))
        .map_err(|e| AuthFlowError::Rejected(format!("unreadable redirect: {e}")))?;
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

    if let Some(error) = params.get("error") {
        let reason = match params.get("error_description").filter(|d| !d.trim().is_empty()) {
            Some(description) => format!("{error}: {description}"),
            None => error.clone(),
        };
        return Err(AuthFlowError::Rejected(reason));
    }
    params
        .get("access_token")
        .filter(|t| !t.is_empty())
        .cloned()
        .ok_or_else(|| AuthFlowError::Rejected("redirect carried no access token".to_owned()))
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
