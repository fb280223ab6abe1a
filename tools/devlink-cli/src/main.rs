//! devlink command-line client.
//!
//! Drives the full client SDK against a running backend: sign in, browse
//! the inbox, chat (push + polling fallback), list developers and orders.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use devlink_client::config::ClientConfig;
use devlink_client::render::RenderedMessage;
use devlink_client::session::{FileSession, SessionStore};
use devlink_client::Client;
use devlink_common::identity::UserId;
use devlink_common::offer::OfferStatus;

#[derive(Parser)]
#[command(name = "devlink", about = "devlink marketplace client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and persist the session.
    Login {
        identifier: String,
        password: String,
    },
    /// Sign out and forget the persisted session.
    Logout,
    /// List conversations.
    Inbox,
    /// Interactive chat with a peer. Type to send; Ctrl-D to leave.
    Chat { peer: String },
    /// List developers available for hire.
    Developers,
    /// List my orders.
    Orders,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let session = FileSession::open().context("open session storage")?;
    let mut client = Client::new(ClientConfig::from_env(), session);

    match cli.command {
        Command::Login {
            identifier,
            password,
        } => {
            client.login(&identifier, &password).await?;
            let auth = client.signed_in().context("login did not stick")?;
            println!("signed in as {} ({})", auth.username, auth.role.as_str());
        }
        Command::Logout => {
            client.logout()?;
            println!("signed out");
        }
        Command::Inbox => inbox(&mut client).await?,
        Command::Chat { peer } => chat(&mut client, UserId(peer)).await?,
        Command::Developers => {
            for dev in client.developers().await? {
                let rate = dev
                    .hourly_rate
                    .map(|r| format!("{r}/h"))
                    .unwrap_or_else(|| "rate on request".to_string());
                println!(
                    "{:<20} {} orders, {rate} — {}",
                    dev.user.username,
                    dev.completed_orders,
                    dev.skills.join(", ")
                );
            }
        }
        Command::Orders => {
            for order in client.my_orders().await? {
                println!(
                    "{:<12} {:<12} {:>10}  {}",
                    order.id.0,
                    format!("{:?}", order.status),
                    order.amount.to_string(),
                    order.description
                );
            }
        }
    }
    Ok(())
}

async fn inbox<S: SessionStore>(client: &mut Client<S>) -> Result<()> {
    client.load_conversations().await?;
    if let Some(err) = &client.store().last_error {
        println!("inbox unavailable: {err}");
        return Ok(());
    }
    let me = client.signed_in().context("not signed in")?.user_id.clone();
    let conversations = client.store().conversations();
    if conversations.is_empty() {
        println!("no conversations yet");
    }
    for conv in conversations {
        let peer = conv
            .peer_of(&me)
            .map(|p| p.to_string())
            .unwrap_or_else(|| "?".to_string());
        match &conv.last_message {
            Some(preview) => println!(
                "{peer}: {}  ({})",
                preview.excerpt,
                preview.sent_at.format("%Y-%m-%d %H:%M")
            ),
            None => println!("{peer}: (no messages)"),
        }
    }
    Ok(())
}

async fn chat<S: SessionStore>(client: &mut Client<S>, peer: UserId) -> Result<()> {
    client.open_conversation(&peer).await?;

    let mut printed = 0;
    printed = print_new(client, printed);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            pushed = client.next_push() => {
                if !pushed {
                    // channel gone: fall back to polling
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    if let Err(e) = client.refresh_messages().await {
                        tracing::warn!("resync failed: {e}");
                    }
                }
                printed = print_new(client, printed);
            }
            line = lines.next_line() => {
                match line? {
                    Some(text) if !text.trim().is_empty() => {
                        client.send_text(&text).await?;
                        printed = print_new(client, printed);
                    }
                    Some(_) => {}
                    None => break,
                }
            }
        }
    }
    Ok(())
}

/// Print messages rendered since the last call; returns the new count.
fn print_new<S: SessionStore>(client: &Client<S>, printed: usize) -> usize {
    let rendered = client.render_active();
    for message in rendered.iter().skip(printed) {
        print_rendered(message);
    }
    rendered.len()
}

fn print_rendered(message: &RenderedMessage) {
    match message {
        RenderedMessage::PlainText { text } => println!("| {text}"),
        RenderedMessage::Attachment { file_name, url } => {
            println!("| [attachment] {file_name} <{url}>")
        }
        RenderedMessage::VideoInvite { room_id } => {
            println!("| [video invite] room {room_id}")
        }
        RenderedMessage::CancellationNotice { room_id } => {
            println!("| [meeting cancelled] room {room_id}")
        }
        RenderedMessage::WithdrawalNotice { offer_id } => {
            println!("| [offer withdrawn] {}", offer_id.0)
        }
        RenderedMessage::OfferCard {
            offer,
            status,
            can_accept,
        } => {
            let state = match status {
                OfferStatus::Open if *can_accept => "open — accept with the web app",
                OfferStatus::Open => "open",
                OfferStatus::Accepted => "accepted",
                OfferStatus::Withdrawn => "withdrawn",
            };
            println!(
                "| [offer {}] {} — {} in {} day(s), {} revision(s) [{state}]",
                offer.id.0,
                offer.terms.description,
                offer.terms.amount,
                offer.terms.delivery_days,
                offer.terms.revisions
            );
        }
        RenderedMessage::Hidden => {}
    }
}
