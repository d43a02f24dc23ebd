//! Application state — single-owner, main-thread only.
//!
//! All dashboard state lives here. The worker thread communicates via
//! channels; `apply_response` folds its messages into this state.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender};
use std::time::Instant;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use pricecast_core::domain::Ticker;
use pricecast_core::{ErrorKind, PipelineError};
use pricecast_runner::{DashboardReport, Stage};

use crate::worker::{WorkerCommand, WorkerResponse};

const ERROR_HISTORY_CAP: usize = 50;

/// Which panel is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Panel {
    Tickers,
    History,
    Forecast,
    Backtest,
    Tuning,
    Help,
}

impl Panel {
    pub const ALL: [Panel; 6] = [
        Panel::Tickers,
        Panel::History,
        Panel::Forecast,
        Panel::Backtest,
        Panel::Tuning,
        Panel::Help,
    ];

    pub fn index(self) -> usize {
        match self {
            Panel::Tickers => 0,
            Panel::History => 1,
            Panel::Forecast => 2,
            Panel::Backtest => 3,
            Panel::Tuning => 4,
            Panel::Help => 5,
        }
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Panel::Tickers => "Tickers",
            Panel::History => "History",
            Panel::Forecast => "Forecast",
            Panel::Backtest => "Backtest",
            Panel::Tuning => "Tuning",
            Panel::Help => "Help",
        }
    }

    pub fn next(self) -> Panel {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Panel {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Status message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// An error record for the error history overlay.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub timestamp: NaiveDateTime,
    pub ticker: Ticker,
    pub error: PipelineError,
}

impl ErrorRecord {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

/// What the report panels currently show.
#[derive(Debug, Clone)]
pub enum View {
    /// Nothing has run yet.
    Empty,
    Loading { ticker: Ticker, stage: Stage, started: Instant },
    Ready(Box<DashboardReport>),
    Failed { ticker: Ticker, error: PipelineError },
}

/// Which overlay (if any) is shown on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    None,
    Welcome,
    ErrorHistory,
}

/// Top-level application state.
pub struct AppState {
    pub active_panel: Panel,
    pub running: bool,

    // Ticker selector
    pub tickers: Vec<Ticker>,
    pub cursor: usize,
    pub selected: Option<Ticker>,

    // Pipeline
    pub view: View,
    /// Selection made while a run was in flight; started when it finishes.
    pub queued: Option<Ticker>,

    // Scroll offsets
    pub history_scroll: usize,
    pub forecast_scroll: usize,
    pub tuning_scroll: usize,

    // Worker communication
    pub worker_tx: Sender<WorkerCommand>,
    pub worker_rx: Receiver<WorkerResponse>,

    // Cross-cutting
    pub status_message: Option<(String, StatusLevel)>,
    pub error_history: VecDeque<ErrorRecord>,
    pub error_scroll: usize,
    pub overlay: Overlay,
    pub tick: u64,

    pub state_path: PathBuf,
}

impl AppState {
    pub fn new(
        tickers: Vec<Ticker>,
        worker_tx: Sender<WorkerCommand>,
        worker_rx: Receiver<WorkerResponse>,
        state_path: PathBuf,
    ) -> Self {
        Self {
            active_panel: Panel::Tickers,
            running: true,
            tickers,
            cursor: 0,
            selected: None,
            view: View::Empty,
            queued: None,
            history_scroll: 0,
            forecast_scroll: 0,
            tuning_scroll: 0,
            worker_tx,
            worker_rx,
            status_message: None,
            error_history: VecDeque::with_capacity(ERROR_HISTORY_CAP),
            error_scroll: 0,
            overlay: Overlay::None,
            tick: 0,
            state_path,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.view, View::Loading { .. })
    }

    pub fn report(&self) -> Option<&DashboardReport> {
        match &self.view {
            View::Ready(report) => Some(report),
            _ => None,
        }
    }

    pub fn cursor_ticker(&self) -> Option<&Ticker> {
        self.tickers.get(self.cursor)
    }

    /// Move the cursor onto `ticker` if it is in the selector.
    pub fn focus_ticker(&mut self, ticker: &Ticker) -> bool {
        match self.tickers.iter().position(|t| t == ticker) {
            Some(i) => {
                self.cursor = i;
                true
            }
            None => false,
        }
    }

    /// Select a ticker and start (or queue) its pipeline run.
    ///
    /// While a run is in flight only the latest selection is kept.
    pub fn select(&mut self, ticker: Ticker) {
        self.selected = Some(ticker.clone());
        if self.is_loading() {
            self.set_status(format!("{ticker} queued"));
            self.queued = Some(ticker);
            return;
        }
        self.start_run(ticker);
    }

    fn start_run(&mut self, ticker: Ticker) {
        self.history_scroll = 0;
        self.forecast_scroll = 0;
        self.tuning_scroll = 0;
        if self
            .worker_tx
            .send(WorkerCommand::Run {
                ticker: ticker.clone(),
            })
            .is_err()
        {
            self.set_warning("worker is not running");
            return;
        }
        self.set_status(format!("Running pipeline for {ticker}"));
        self.view = View::Loading {
            ticker,
            stage: Stage::Loading,
            started: Instant::now(),
        };
    }

    /// Fold one worker message into the state.
    pub fn apply_response(&mut self, resp: WorkerResponse) {
        match resp {
            WorkerResponse::Progress { ticker, stage: new_stage } => {
                if let View::Loading { ticker: current, stage, .. } = &mut self.view {
                    if *current == ticker {
                        *stage = new_stage;
                    }
                }
            }
            WorkerResponse::Done { ticker, report } => {
                if let Some(next) = self.queued.take() {
                    debug!(finished = %ticker, next = %next, "dropping superseded result");
                    self.start_run(next);
                    return;
                }
                self.set_status(report.projected_change_line());
                self.view = View::Ready(report);
            }
            WorkerResponse::Failed { ticker, error } => {
                if let Some(next) = self.queued.take() {
                    debug!(failed = %ticker, next = %next, "dropping superseded failure");
                    self.start_run(next);
                    return;
                }
                self.push_error(ticker.clone(), error.clone());
                self.view = View::Failed { ticker, error };
            }
        }
    }

    /// Push an error to the history, capping at 50.
    pub fn push_error(&mut self, ticker: Ticker, error: PipelineError) {
        self.status_message = Some((error.to_string(), StatusLevel::Error));
        self.error_history.push_front(ErrorRecord {
            timestamp: chrono::Local::now().naive_local(),
            ticker,
            error,
        });
        if self.error_history.len() > ERROR_HISTORY_CAP {
            self.error_history.pop_back();
        }
    }

    /// Set an info status message.
    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Info));
    }

    /// Set a warning status message.
    pub fn set_warning(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Warning));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::mpsc;

    pub(crate) fn t(s: &str) -> Ticker {
        Ticker::new(s).unwrap()
    }

    pub(crate) fn test_app() -> (AppState, Receiver<WorkerCommand>, Sender<WorkerResponse>) {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let app = AppState::new(
            vec![t("AAPL"), t("MSFT"), t("TSLA")],
            cmd_tx,
            resp_rx,
            PathBuf::from("state.json"),
        );
        (app, cmd_rx, resp_tx)
    }

    fn sent(rx: &Receiver<WorkerCommand>) -> Vec<String> {
        rx.try_iter()
            .filter_map(|c| match c {
                WorkerCommand::Run { ticker } => Some(ticker.to_string()),
                WorkerCommand::Shutdown => None,
            })
            .collect()
    }

    #[test]
    fn panel_cycle() {
        assert_eq!(Panel::Tickers.next(), Panel::History);
        assert_eq!(Panel::Help.next(), Panel::Tickers);
        assert_eq!(Panel::Tickers.prev(), Panel::Help);
        assert_eq!(Panel::History.prev(), Panel::Tickers);
    }

    #[test]
    fn panel_from_index() {
        for i in 0..6 {
            let p = Panel::from_index(i).unwrap();
            assert_eq!(p.index(), i);
        }
        assert!(Panel::from_index(6).is_none());
    }

    #[test]
    fn select_starts_run_and_shows_loading() {
        let (mut app, rx, _resp) = test_app();
        app.select(t("MSFT"));
        assert!(app.is_loading());
        assert_eq!(sent(&rx), vec!["MSFT"]);
    }

    #[test]
    fn latest_selection_wins() {
        let (mut app, rx, _resp) = test_app();
        app.select(t("AAPL"));
        app.select(t("MSFT"));
        app.select(t("TSLA"));
        assert_eq!(sent(&rx), vec!["AAPL"]);
        assert_eq!(app.queued, Some(t("TSLA")));

        app.apply_response(WorkerResponse::Failed {
            ticker: t("AAPL"),
            error: PipelineError::DataUnavailable("down".into()),
        });
        // the stale failure is dropped and the queued ticker starts
        assert_eq!(sent(&rx), vec!["TSLA"]);
        assert!(app.error_history.is_empty());
        assert!(matches!(&app.view, View::Loading { ticker, .. } if *ticker == t("TSLA")));
    }

    #[test]
    fn failure_replaces_view_and_records_error() {
        let (mut app, _rx, _resp) = test_app();
        app.select(t("AAPL"));
        app.apply_response(WorkerResponse::Failed {
            ticker: t("AAPL"),
            error: PipelineError::InsufficientData("no price history for AAPL".into()),
        });
        assert!(app.report().is_none());
        assert!(matches!(app.view, View::Failed { .. }));
        assert_eq!(app.error_history.len(), 1);
        assert_eq!(app.error_history[0].kind(), ErrorKind::InsufficientData);
        let (msg, level) = app.status_message.clone().unwrap();
        assert_eq!(level, StatusLevel::Error);
        assert_eq!(msg, "InsufficientData: no price history for AAPL");
    }

    #[test]
    fn progress_updates_stage() {
        let (mut app, _rx, _resp) = test_app();
        app.select(t("AAPL"));
        app.apply_response(WorkerResponse::Progress {
            ticker: t("AAPL"),
            stage: Stage::Backtesting,
        });
        assert!(matches!(app.view, View::Loading { stage: Stage::Backtesting, .. }));
    }

    #[test]
    fn error_history_caps_at_50() {
        let (mut app, _rx, _resp) = test_app();
        for i in 0..60 {
            app.push_error(t("AAPL"), PipelineError::ModelFitFailure(format!("error {i}")));
        }
        assert_eq!(app.error_history.len(), 50);
        assert!(app.error_history[0].error.to_string().contains("59"));
    }

    #[test]
    fn focus_ticker_moves_cursor() {
        let (mut app, _rx, _resp) = test_app();
        assert!(app.focus_ticker(&t("TSLA")));
        assert_eq!(app.cursor, 2);
        assert!(!app.focus_ticker(&t("NVDA")));
        assert_eq!(app.cursor, 2);
    }
}
