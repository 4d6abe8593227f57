use crate::config::Config;
use crate::controller::{ChatController, ControllerOptions, ThreadTicket};
use crate::history::{HistorySource, HttpHistory};
use crate::push::{PushChannel, PushSink};
use crate::types::Direction;
use crate::view::ViewState;
use colored::*;
use tokio::sync::mpsc;

/// Headless front-end: `contacts`, `thread <chat_id>`, `send <chat_id> <message>`.
pub async fn run(args: Vec<String>) -> anyhow::Result<()> {
    let bin = args
        .first()
        .map(|s| s.as_str())
        .unwrap_or("cli")
        .to_string();

    let config = Config::from_args(&args)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    let Some(command) = config.positional.first() else {
        print_usage(&bin);
        return Ok(());
    };
    let operands = &config.positional[1..];

    match command.as_str() {
        "contacts" => list_contacts(&config).await?,
        "thread" => {
            let Some(chat_id) = operands.first() else {
                eprintln!("{}", format!("Usage: {} thread <chat_id>", bin).yellow());
                return Ok(());
            };
            show_thread(&config, chat_id).await?;
        }
        "send" => {
            if operands.len() < 2 {
                eprintln!("{}", format!("Usage: {} send <chat_id> <message>", bin).yellow());
                return Ok(());
            }
            let message = operands[1..].join(" ");
            send_message(&config, &operands[0], message).await?;
        }
        _ => {
            eprintln!("{} Unknown command: {}", "✗".red().bold(), command.red());
            print_usage(&bin);
        }
    }

    Ok(())
}

fn print_usage(bin: &str) {
    println!("{}", "💬 Chatdesk CLI".bright_cyan().bold());
    println!();
    println!("{}", "Usage:".bright_white().bold());
    println!("  {} <command> [args] [--server <url>] [--push <addr>]", bin.cyan());
    println!();
    println!("{}", "Commands:".bright_white().bold());
    println!("  {}                         List conversations, most recent first", "contacts".cyan());
    println!("  {} <chat_id>                 Show one conversation thread", "thread".cyan());
    println!("  {} <chat_id> <message>         Send a message", "send".cyan());
}

/// Controller over a retained view, with the full history already applied
async fn loaded_controller(
    config: &Config,
    history: &HttpHistory,
) -> anyhow::Result<ChatController<ViewState>> {
    let mut controller = ChatController::new(
        ViewState::new(),
        ControllerOptions {
            default_platform: config.default_platform.clone(),
        },
    );
    controller.initialize(u32::MAX);
    controller.apply_history(Ok(history.fetch_all().await?));
    Ok(controller)
}

/// Select `chat_id`, using its known name/platform when the history has it
fn select(
    controller: &mut ChatController<ViewState>,
    config: &Config,
    chat_id: &str,
) -> ThreadTicket {
    let (name, platform) = match controller.conversations().get(chat_id) {
        Some(c) => (c.display_name.clone(), c.platform_label.clone()),
        None => (chat_id.to_string(), config.default_platform.clone()),
    };
    controller.select_conversation(chat_id, &name, &platform)
}

async fn list_contacts(config: &Config) -> anyhow::Result<()> {
    let history = HttpHistory::new(config)?;
    let controller = loaded_controller(config, &history).await?;
    let contacts = &controller.view().contacts;

    if contacts.is_empty() {
        println!("{}", "No conversations yet".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("Conversations ({})", contacts.len())
            .bright_cyan()
            .bold()
    );
    println!("{}", "─".repeat(60).dimmed());
    for c in contacts {
        println!(
            "  {} {} [{}] {}",
            c.time.dimmed(),
            c.display_name.cyan().bold(),
            c.conversation_id.dimmed(),
            c.platform.green()
        );
        println!("        {}", c.last_message);
    }
    Ok(())
}

async fn show_thread(config: &Config, chat_id: &str) -> anyhow::Result<()> {
    let history = HttpHistory::new(config)?;
    let mut controller = loaded_controller(config, &history).await?;
    let ticket = select(&mut controller, config, chat_id);
    controller.apply_thread(&ticket, history.fetch_all().await);

    let view = controller.view();
    if let Some(header) = &view.header {
        println!(
            "{} {}",
            header.name.bright_cyan().bold(),
            header.status.dimmed()
        );
    }
    println!("{}", "─".repeat(60).dimmed());
    if view.thread.is_empty() {
        println!("{}", "No messages".yellow());
    }
    for b in &view.thread {
        match b.direction {
            Direction::Inbound => println!("  {} {} {}", b.time.dimmed(), "←".blue(), b.text),
            Direction::Outbound => {
                println!("  {} {} {}", b.time.dimmed(), "→".green(), b.text.green())
            }
        }
    }
    Ok(())
}

async fn send_message(config: &Config, chat_id: &str, message: String) -> anyhow::Result<()> {
    let history = HttpHistory::new(config)?;
    let mut controller = loaded_controller(config, &history).await?;
    select(&mut controller, config, chat_id);
    controller.view_mut().set_input(message);

    let Some(outgoing) = controller.send_message() else {
        eprintln!("{} Nothing to send", "✗".red().bold());
        return Ok(());
    };

    let (events_tx, _events_rx) = mpsc::unbounded_channel();
    let sink = PushChannel::connect(config.push_addr, config.request_timeout, events_tx).await?;
    sink.emit(outgoing.clone()).await?;

    println!(
        "{} Sent to {} via {}: {}",
        "✓".green().bold(),
        outgoing.conversation_id.cyan(),
        outgoing.platform,
        outgoing.text
    );
    Ok(())
}
