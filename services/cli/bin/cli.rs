//! Terminal front end for a realtime voice session.
//!
//! Reads commands and text from stdin, prints status changes, chat messages
//! and errors as they arrive, and shuts the session down on `/quit` or Ctrl+C.

use anyhow::Context;
use clap::Parser;
use openai_realtime::WsSessionFactory;
use realtime_voice_cli::{
    args::Args,
    audio_in::{self, FilePcmSource},
    audio_out::FileAudioSink,
    command::{Command, HELP},
    config::Config,
};
use realtime_voice_core::{
    ControllerEvent, Role, SessionController,
    assembler::AssemblerSettings,
    options::{AudioSink, ConnectionStatus},
    web_search::WebSearchSettings,
};
use secrecy::{ExposeSecret, SecretString};
use std::{path::Path, sync::Arc};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
    task::JoinHandle,
};
use tracing::{info, warn};

/// Streams `path` into `tx` from a background task.
async fn start_audio_feed(path: &Path, tx: mpsc::Sender<Vec<u8>>) -> Option<JoinHandle<()>> {
    match FilePcmSource::open(path).await {
        Ok(source) => {
            info!(path = %path.display(), "Streaming input audio");
            Some(tokio::spawn(audio_in::pump(source, tx)))
        }
        Err(e) => {
            println!("! cannot read {}: {e}", path.display());
            None
        }
    }
}

fn print_event(event: ControllerEvent) {
    match event {
        ControllerEvent::Status(ConnectionStatus::Connecting) => println!("* connecting..."),
        ControllerEvent::Status(ConnectionStatus::Connected) => println!("* connected"),
        ControllerEvent::Status(ConnectionStatus::Disconnected) => println!("* disconnected"),
        ControllerEvent::Message(message) => {
            let role = match message.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            println!("[{role}] {}", message.text);
        }
        ControllerEvent::Error(message) => println!("! {message}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let args = Args::parse();
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(mode) = args.mode {
        config.session_mode = mode;
    }

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();
    info!(
        mode = %config.session_mode,
        transport = %args.transport.unwrap_or(config.transport),
        api_base = %config.api_base.as_str(),
        "Configuration loaded."
    );

    // --- 3. Build the Controller ---
    let audio_sink: Option<Arc<dyn AudioSink>> = match &args.audio_out {
        Some(path) => Some(Arc::new(
            FileAudioSink::create(path)
                .with_context(|| format!("Failed to create audio file {}", path.display()))?,
        )),
        None => None,
    };
    let settings = AssemblerSettings {
        api_base: config.api_base.clone(),
        web_search: WebSearchSettings {
            api_base: config.api_base.clone(),
            model: config.web_search_model.clone(),
            ..WebSearchSettings::default()
        },
    };
    let (controller, mut updates) = SessionController::new(Arc::new(WsSessionFactory), settings);
    let mut controller = controller.with_connect_timeout(config.connect_timeout);
    // not connected yet, so this only records the mode
    controller.switch_mode(config.session_mode).await?;

    let mut api_key = config.openai_api_key.clone();
    let mut connect_now = args.connect;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let (audio_tx, mut audio_rx) = mpsc::channel::<Vec<u8>>(16);
    let mut audio_feed: Option<JoinHandle<()>> = None;
    println!("{HELP}");

    // --- 4. Run the Prompt Loop ---
    loop {
        if std::mem::take(&mut connect_now) {
            let key = api_key.as_ref().map(|k| k.expose_secret()).unwrap_or_default();
            let mut options = args.connection_options(&config, key, controller.mode());
            options.audio_sink = audio_sink.clone();
            // failures are reported through the update channel
            let connected = controller.connect(options).await.is_ok();
            if let Some(feed) = audio_feed.take() {
                feed.abort();
            }
            if let (true, Some(path)) = (connected, &args.audio_in) {
                audio_feed = start_audio_feed(path, audio_tx.clone()).await;
            }
        }

        tokio::select! {
            Some(update) = updates.recv() => print_event(update),
            Some(chunk) = audio_rx.recv() => {
                if let Err(e) = controller.send_audio(&chunk).await {
                    warn!(error = %e, "Dropped input audio chunk");
                }
            },
            event = controller.next_session_event() => match event {
                Some(event) => {
                    controller.handle_session_event(event);
                }
                None => {
                    warn!("Realtime session ended");
                    controller.disconnect().await;
                }
            },
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match Command::parse(&line) {
                    Command::Connect => connect_now = true,
                    Command::Disconnect => {
                        if let Some(feed) = audio_feed.take() {
                            feed.abort();
                        }
                        controller.disconnect().await;
                    }
                    Command::Interrupt => {
                        if let Err(e) = controller.interrupt().await {
                            println!("! {e}");
                        }
                    }
                    Command::Mode(mode) => {
                        if let Err(e) = controller.switch_mode(mode).await {
                            println!("! {e}");
                        } else if controller.status() != ConnectionStatus::Connected {
                            println!("* mode set to {mode}");
                        }
                    }
                    Command::Key(raw) => match controller.set_api_key(&raw) {
                        Ok(()) => {
                            api_key = Some(SecretString::from(raw));
                            println!("* API key updated");
                        }
                        Err(e) => println!("! {e}"),
                    },
                    Command::Text(text) => {
                        if let Err(e) = controller.send_text(&text).await {
                            println!("! {e}");
                        }
                    }
                    Command::Help => println!("{HELP}"),
                    Command::Invalid(reason) => println!("! {reason}"),
                    Command::Quit => break,
                    Command::Empty => {}
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C. Disconnecting...");
                break;
            }
        }
    }

    // --- 5. Shut Down ---
    if let Some(feed) = audio_feed.take() {
        feed.abort();
    }
    controller.shutdown().await;
    while let Ok(update) = updates.try_recv() {
        print_event(update);
    }
    info!("Session closed.");
    Ok(())
}
