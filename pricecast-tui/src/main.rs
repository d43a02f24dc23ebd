//! PriceCast TUI — six-panel stock forecasting dashboard.
//!
//! Panels:
//! 1. Tickers — ticker selector and run status
//! 2. History — `avg_last_price` rows for the selected ticker
//! 3. Forecast — 30-day ARIMA(2,1,2) forecast over history
//! 4. Backtest — rolling-origin MAPE by horizon
//! 5. Tuning — prior-scale grid search
//! 6. Help — keyboard shortcuts

mod app;
mod input;
mod persistence;
mod theme;
mod ui;
mod worker;

use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::{info, warn};

use pricecast_runner::{init_logging, LoggingConfig, PricecastConfig, DEFAULT_CONFIG_FILE};

use crate::app::AppState;
use crate::worker::WorkerCommand;

const LOG_FILE: &str = "pricecast.log";

fn main() -> Result<()> {
    // Restore the terminal before printing a panic.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stderr(), LeaveAlternateScreen);
        default_hook(info);
    }));

    init_logging(LoggingConfig::from_env().with_file(LOG_FILE))?;

    let config_path = std::env::var("PRICECAST_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = PricecastConfig::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let state_path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pricecast")
        .join("state.json");
    let persisted = persistence::load(&state_path);

    let warehouse = config.warehouse.build();
    info!(warehouse = warehouse.name(), tickers = config.tickers.len(), "starting dashboard");

    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (resp_tx, resp_rx) = mpsc::channel();
    let worker_handle = worker::spawn_worker(config.clone(), warehouse, cmd_rx, resp_tx)
        .context("spawning worker thread")?;

    let mut app = AppState::new(config.tickers.clone(), cmd_tx.clone(), resp_rx, state_path.clone());
    persistence::apply(&mut app, persisted);
    if let Some(ticker) = app.cursor_ticker().cloned() {
        app.select(ticker);
    }

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, &mut app);

    let persisted = persistence::extract(&app);
    if let Err(e) = persistence::save(&state_path, &persisted) {
        warn!(error = %e, path = %state_path.display(), "could not save dashboard state");
    }

    let _ = cmd_tx.send(WorkerCommand::Shutdown);
    let _ = worker_handle.join();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
) -> Result<()> {
    loop {
        app.tick = app.tick.wrapping_add(1);
        terminal.draw(|f| ui::draw(f, app))?;

        while let Ok(resp) = app.worker_rx.try_recv() {
            app.apply_response(resp);
        }

        // 50ms poll keeps the spinner moving at ~20 FPS.
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    input::handle_key(app, key);
                }
            }
        }

        if !app.running {
            break;
        }
    }
    Ok(())
}
