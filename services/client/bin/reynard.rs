//! Main Entrypoint for the Reynard Console Client
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Wiring the store, transport, and speech collaborators.
//! 4. Restoring the conversation session and rendering its events.
//! 5. Running the stdin loop until EOF or Ctrl+C.

use anyhow::{Context, Result};
use reynard_client::{config::Config, voice::TracingSink};
use reynard_core::{
    gate::{WakeGate, run_voice_gate},
    session::{ConversationController, SessionEvent, SessionOptions},
    speech::Speaker,
    store::JsonFileStore,
    transcript::Role,
    transport::HttpChatTransport,
};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

/// Renders one observer event to the console.
fn render(event: SessionEvent) {
    match event {
        SessionEvent::MessageAdded { message } => {
            println!("[{}] {}", message.role, message.content);
        }
        SessionEvent::Busy { .. } => {}
        SessionEvent::ReplyStarted => print!("[assistant] "),
        SessionEvent::ReplyDelta { chunk, .. } => print!("{chunk}"),
        SessionEvent::ReplyEnded { .. } => println!(),
        SessionEvent::Notice { text } => println!("[notice] {text}"),
    }
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Restoring session...");

    // --- 3. Wire Collaborators ---
    let store = Arc::new(JsonFileStore::new(&config.data_dir));
    let transport = Arc::new(HttpChatTransport::new(&config.chat_endpoint));
    let speaker = Arc::new(Speaker::new(Arc::new(TracingSink), config.voice.clone()));
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    let controller = Arc::new(
        ConversationController::new(
            store,
            transport,
            speaker.clone(),
            events_tx,
            SessionOptions::default(),
        )
        .await,
    );

    // Replay the restored history once, then follow live events.
    for message in controller.messages().await {
        if message.role != Role::System {
            println!("[{}] {}", message.role, message.content);
        }
    }
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            render(event);
        }
    });

    // --- 4. Start the Voice Gate ---
    // Finalized recognition results arrive on this channel; the console
    // simulates them with `/say <text>` lines.
    let (heard_tx, heard_rx) = mpsc::channel::<Result<String>>(16);
    let gate = WakeGate::new(&config.wake_token);
    tokio::spawn(run_voice_gate(
        heard_rx,
        gate,
        controller.clone(),
        speaker.clone(),
    ));

    info!(
        endpoint = %config.chat_endpoint,
        wake_token = %config.wake_token,
        "Reynard ready. Type a message, or `/say <text>` to simulate speech."
    );

    // --- 5. Input Loop ---
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if let Some(heard) = line.strip_prefix("/say ") {
                    let _ = heard_tx.send(Ok(heard.to_owned())).await;
                } else {
                    controller.submit(&line).await;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal. Shutting down gracefully...");
                break;
            }
        }
    }

    info!("Session closed.");
    Ok(())
}
