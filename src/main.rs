//! Interactive chat session on the terminal
//!
//! Lines typed on stdin are sent to the bot; `/stop`, `/reset`,
//! `/upload <url>` and `/quit` drive the session controls. Answers are
//! printed to stdout as they stream. Logs go to stderr as JSON.

use chat_session::message::MessageId;
use chat_session::runtime::InMemoryHistory;
use chat_session::speech::SilentSpeech;
use chat_session::transport::{BotTransport, EchoTransport};
use chat_session::{BotId, SendOptions, SessionConfig, SessionKey, SessionRegistry, SessionView};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_session=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = SessionConfig::from_env()?;
    let bot_id = BotId::new(std::env::var("CHAT_BOT").unwrap_or_else(|_| "bing".to_string()));
    tracing::info!(
        bot = %bot_id,
        style = %config.conversation_style,
        speech = config.speech,
        "Starting chat session"
    );

    let transport: Arc<dyn BotTransport> = Arc::new(EchoTransport::default());
    let registry = SessionRegistry::new(
        config,
        Arc::new(move |_: &BotId| transport.clone()),
        Arc::new(InMemoryHistory::new()),
        Arc::new(SilentSpeech),
    );
    let session = registry.get_or_create(SessionKey::singleton(bot_id)).await;

    let printer = tokio::spawn(print_answers(session.updates()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line.split_once(' ').map_or((line, ""), |(cmd, rest)| (cmd, rest.trim())) {
            ("", _) => {}
            ("/quit", _) => break,
            ("/stop", _) => session.stop_generating().await,
            ("/reset", _) => {
                session.reset_conversation().await;
                println!("-- conversation reset");
            }
            ("/upload", url) if !url.is_empty() => session.upload_image(url).await,
            ("/upload", _) => println!("-- usage: /upload <url>"),
            _ => {
                session.send_message(line, SendOptions::default()).await;
            }
        }
    }

    printer.abort();
    Ok(())
}

/// Print the streaming bot message incrementally
async fn print_answers(mut updates: impl tokio_stream::Stream<Item = SessionView> + Unpin) {
    let mut current: Option<MessageId> = None;
    let mut printed = String::new();
    let mut attachment = None;

    while let Some(view) = updates.next().await {
        if view.attachment != attachment {
            if let Some(a) = &view.attachment {
                println!("-- attachment {:?}: {}", a.status, a.url);
            }
            attachment.clone_from(&view.attachment);
        }

        if let Some(id) = &view.generating_message_id {
            if current.as_ref() != Some(id) {
                if current.is_some() {
                    println!();
                }
                current = Some(id.clone());
                printed.clear();
                print!("bot> ");
            }
        }

        let Some(id) = current.clone() else {
            continue;
        };
        let Some(message) = view.message(&id) else {
            // Transcript was reset underneath us
            current = None;
            continue;
        };

        if let Some(suffix) = message.text.strip_prefix(printed.as_str()) {
            print!("{suffix}");
            printed.push_str(suffix);
        }
        let _ = std::io::stdout().flush();

        if view.generating_message_id.as_ref() != Some(&id) {
            println!();
            if let Some(error) = &message.error {
                println!("-- error: {error}");
            }
            current = None;
        }
    }
}
