/// Chatdesk terminal client - Main entry point
use chatdesk_core::controller::{ChatController, ControllerOptions};
use chatdesk_core::history::HttpHistory;
use chatdesk_core::push::{PushChannel, PushSender};
use chatdesk_core::session::ChatSession;
use chatdesk_core::tui::{self, Flow, RestoreOnDrop, TuiState};
use chatdesk_core::view::ViewState;
use chatdesk_core::Config;
use crossterm::{
    cursor::Show,
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::env;
use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let config = Config::from_args(&args)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    // Log to a file; stderr belongs to the terminal UI
    let log_file = File::create(&config.log_file)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    info!("💬 Starting chatdesk");
    info!("   History: {}", config.history_url());
    info!("   Push channel: {}", config.push_addr);
    if !config.positional.is_empty() {
        warn!("Ignoring extra arguments: {:?}", config.positional);
    }

    let history = HttpHistory::new(&config)?;
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let connect = PushChannel::connect(config.push_addr, config.request_timeout, events_tx.clone());
    let sink = match connect.await {
        Ok(sink) => sink,
        Err(e) => {
            warn!("Push channel unavailable ({}); continuing without live updates", e);
            PushSender::disconnected()
        }
    };

    let controller = ChatController::new(
        ViewState::new(),
        ControllerOptions {
            default_platform: config.default_platform.clone(),
        },
    );
    let mut session = ChatSession::new(controller, history, sink, events_tx);

    let (columns, _) = crossterm::terminal::size()?;
    session.start(config.viewport_width(columns));

    // TUI setup; the guard restores the terminal on every exit path
    enable_raw_mode()?;
    let restore = RestoreOnDrop::new(|| {
        let _ = disable_raw_mode();
        let _ = execute!(std::io::stdout(), LeaveAlternateScreen, Show);
    });
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let res = run_app(&mut terminal, &mut session, &mut events_rx).await;
    drop(terminal);
    drop(restore);

    if let Err(e) = res {
        eprintln!("TUI error: {e}");
    }
    info!("chatdesk stopped");
    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    session: &mut ChatSession<ViewState, HttpHistory>,
    events_rx: &mut mpsc::UnboundedReceiver<chatdesk_core::session::AppEvent>,
) -> std::io::Result<()> {
    let mut ui = TuiState::for_view(session.view());
    let mut last_redraw = Instant::now();

    loop {
        // Drain collaborator events
        while let Ok(ev) = events_rx.try_recv() {
            session.handle(ev);
        }

        // Handle keys
        if event::poll(Duration::from_millis(5))? {
            if let Event::Key(key) = event::read()? {
                if tui::handle_key(session, &mut ui, key) == Flow::Quit {
                    return Ok(());
                }
            }
        }

        if last_redraw.elapsed() >= Duration::from_millis(16) {
            terminal.draw(|f| tui::draw(f, session.view(), &ui))?;
            last_redraw = Instant::now();
        }

        tokio::time::sleep(Duration::from_millis(8)).await;
    }
}
