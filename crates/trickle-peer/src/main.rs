//! trickle-peer — interactive peer front end.
//!
//! Thin I/O glue: prompts for credentials, then maps the command set
//! (get, lap, lpf, pub, sch, unp, xit) onto the library and prints
//! human-readable outcomes. Owns no protocol state.

use std::io::Write as _;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use trickle_core::config::TrickleConfig;
use trickle_peer::tracker::{heartbeat_loop, AuthStatus, ClientError, TrackerClient};
use trickle_peer::{derive_port, transfer};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = TrickleConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        TrickleConfig::default()
    });

    // Optional positional override: trickle-peer <host:port>
    let tracker_addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.peer.tracker_addr.clone());

    let client = TrackerClient::connect(&tracker_addr, config.peer.request_timeout())
        .await
        .with_context(|| format!("cannot reach tracker at {tracker_addr}"))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // Loop until successful authentication.
    let username = loop {
        let username = prompt(&mut lines, "Enter your username: ").await?;
        let password = prompt(&mut lines, "Enter your password: ").await?;
        match client.authenticate(&username, &password).await {
            Ok(AuthStatus::Accepted) => {
                println!("Welcome to Trickle!");
                break username;
            }
            Ok(AuthStatus::AlreadyActive) => {
                println!("This account is already logged in from another device.")
            }
            Ok(AuthStatus::Rejected) => println!("Invalid username or password."),
            Err(ClientError::Timeout) => println!("Authentication request timed out."),
            Err(e) => return Err(e.into()),
        }
        println!("Authentication failed. Please try again.");
    };

    // Transfer listener on the username-derived port. If a second
    // username on this host derives the same port, this bind fails —
    // the collision is a known limitation of the scheme.
    let tcp_port = derive_port(&username)?;
    let listener = transfer::bind_listener(tcp_port)
        .with_context(|| format!("cannot bind transfer port {tcp_port} (derived from username)"))?;
    tracing::info!(port = tcp_port, "transfer listener port");
    let share_dir = config.peer.share_dir.clone();
    tokio::spawn(transfer::serve_loop(listener, share_dir.clone()));

    tokio::spawn(heartbeat_loop(
        client.clone(),
        username.clone(),
        config.peer.heartbeat_interval(),
    ));

    println!("Available commands are: get, lap, lpf, pub, sch, unp, xit");
    loop {
        let line = prompt(&mut lines, "> ").await?;
        let (command, arg) = match line.split_once(' ') {
            Some((c, a)) => (c, a.trim()),
            None => (line.as_str(), ""),
        };
        match (command, arg) {
            ("xit", _) => {
                println!("Goodbye");
                break;
            }
            ("lap", _) => cmd_active_peers(&client, &username).await,
            ("lpf", _) => cmd_published_files(&client, &username).await,
            ("pub", file) if !file.is_empty() => {
                cmd_publish(&client, &username, file, tcp_port).await
            }
            ("unp", file) if !file.is_empty() => {
                cmd_unpublish(&client, &username, file, tcp_port).await
            }
            ("sch", needle) if !needle.is_empty() => cmd_search(&client, &username, needle).await,
            ("get", file) if !file.is_empty() => {
                cmd_get(&client, &username, file, &share_dir, &config).await
            }
            _ => println!("Invalid command. Please enter one of: get, lap, lpf, pub, sch, unp, xit"),
        }
    }

    Ok(())
}

/// Print a prompt and read one trimmed line. EOF ends the session.
async fn prompt(lines: &mut Lines<BufReader<Stdin>>, text: &str) -> Result<String> {
    print!("{text}");
    std::io::stdout().flush().ok();
    match lines.next_line().await? {
        Some(line) => Ok(line.trim().to_string()),
        None => {
            println!("Goodbye");
            std::process::exit(0);
        }
    }
}

async fn cmd_active_peers(client: &TrackerClient, username: &str) {
    match client.active_peers(username).await {
        Ok(peers) if peers.is_empty() => println!("No active peers found."),
        Ok(peers) => {
            let label = if peers.len() == 1 { "peer" } else { "peers" };
            println!("{} active {label}:", peers.len());
            for name in peers {
                println!("{name}");
            }
        }
        Err(ClientError::Timeout) => println!("Active peers request timed out."),
        Err(e) => println!("Active peers request unsuccessful: {e}"),
    }
}

async fn cmd_publish(client: &TrackerClient, username: &str, filename: &str, port: u16) {
    match client.publish(username, filename, port).await {
        Ok(true) => println!("File published successfully."),
        Ok(false) => println!("File publish unsuccessful"),
        Err(ClientError::Timeout) => println!("Publish request timed out."),
        Err(e) => println!("File publish unsuccessful: {e}"),
    }
}

async fn cmd_unpublish(client: &TrackerClient, username: &str, filename: &str, port: u16) {
    match client.unpublish(username, filename, port).await {
        Ok(true) => println!("File unpublished successfully."),
        Ok(false) => println!("File unpublishing failed"),
        Err(ClientError::Timeout) => println!("Unpublish request timed out."),
        Err(e) => println!("File unpublishing failed: {e}"),
    }
}

async fn cmd_published_files(client: &TrackerClient, username: &str) {
    match client.published_files(username).await {
        Ok(files) if files.is_empty() => println!("No file published"),
        Ok(files) => {
            let label = if files.len() == 1 { "file" } else { "files" };
            println!("{} {label} published:", files.len());
            for name in files {
                println!("{name}");
            }
        }
        Err(ClientError::Timeout) => println!("List files request timed out."),
        Err(e) => println!("No file published: {e}"),
    }
}

async fn cmd_search(client: &TrackerClient, username: &str, needle: &str) {
    match client.search(needle, username).await {
        Ok(files) if files.is_empty() => println!("No files found"),
        Ok(files) => {
            println!("{} file(s) found containing '{needle}':", files.len());
            for name in files {
                println!("{name}");
            }
        }
        Err(ClientError::Timeout) => println!("Search request timed out."),
        Err(e) => println!("No files found: {e}"),
    }
}

async fn cmd_get(
    client: &TrackerClient,
    username: &str,
    filename: &str,
    share_dir: &std::path::Path,
    config: &TrickleConfig,
) {
    let resolved = match client.query_file(filename, username).await {
        Ok(Some(addr)) => addr,
        Ok(None) => {
            println!("File not found or no active peer available.");
            return;
        }
        Err(ClientError::Timeout) => {
            println!("Query request timed out.");
            return;
        }
        Err(e) => {
            println!("Query request failed: {e}");
            return;
        }
    };
    let (host, port) = resolved;
    match transfer::download(host, port, filename, share_dir, config.peer.request_timeout()).await {
        Ok(_) => println!("{filename} downloaded successfully."),
        Err(e) => println!("Error downloading file: {e}"),
    }
}
