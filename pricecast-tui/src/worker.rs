//! Background worker thread: every pipeline run happens here.
//!
//! Communication with the UI thread is via `mpsc` channels. The worker owns
//! the warehouse and a private rayon pool for the grid search, so the render
//! loop never blocks on a query or a model fit.

use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{error, info, warn};

use pricecast_core::data::Warehouse;
use pricecast_core::domain::Ticker;
use pricecast_core::PipelineError;
use pricecast_runner::{run_pipeline_with_progress, DashboardReport, PricecastConfig, Stage};

/// Commands sent from the UI to the worker.
#[derive(Debug)]
pub enum WorkerCommand {
    Run { ticker: Ticker },
    Shutdown,
}

/// Responses sent from the worker back to the UI.
#[derive(Debug, Clone)]
pub enum WorkerResponse {
    Progress { ticker: Ticker, stage: Stage },
    Done { ticker: Ticker, report: Box<DashboardReport> },
    Failed { ticker: Ticker, error: PipelineError },
}

/// Spawn the background worker thread.
pub fn spawn_worker(
    config: PricecastConfig,
    warehouse: Box<dyn Warehouse>,
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("pricecast-worker".into())
        .spawn(move || worker_loop(config, warehouse, rx, tx))
}

fn worker_loop(
    config: PricecastConfig,
    warehouse: Box<dyn Warehouse>,
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
) {
    let pool = match rayon::ThreadPoolBuilder::new()
        .thread_name(|i| format!("pricecast-pool-{i}"))
        .build()
    {
        Ok(pool) => Some(pool),
        Err(e) => {
            warn!(error = %e, "could not build worker pool, using the global pool");
            None
        }
    };

    loop {
        let ticker = match rx.recv() {
            Ok(WorkerCommand::Run { ticker }) => ticker,
            Ok(WorkerCommand::Shutdown) | Err(_) => break,
        };

        let run = || {
            run_pipeline_with_progress(&config, warehouse.as_ref(), &ticker, |stage| {
                let _ = tx.send(WorkerResponse::Progress {
                    ticker: ticker.clone(),
                    stage,
                });
            })
        };
        let outcome = match &pool {
            Some(pool) => pool.install(run),
            None => run(),
        };

        let response = match outcome {
            Ok(report) => {
                info!(ticker = %ticker, "run finished");
                WorkerResponse::Done {
                    ticker,
                    report: Box::new(report),
                }
            }
            Err(e) => {
                error!(ticker = %ticker, error = %e, "run failed");
                WorkerResponse::Failed { ticker, error: e }
            }
        };
        if tx.send(response).is_err() {
            break;
        }
    }
    info!("worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricecast_core::data::{MemoryWarehouse, SyntheticWarehouse};
    use pricecast_core::ErrorKind;
    use std::sync::mpsc;

    fn ticker(s: &str) -> Ticker {
        Ticker::new(s).unwrap()
    }

    fn spawn(warehouse: Box<dyn Warehouse>) -> (
        Sender<WorkerCommand>,
        Receiver<WorkerResponse>,
        JoinHandle<()>,
    ) {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let handle = spawn_worker(PricecastConfig::default(), warehouse, cmd_rx, resp_tx).unwrap();
        (cmd_tx, resp_rx, handle)
    }

    fn final_response(rx: &Receiver<WorkerResponse>) -> WorkerResponse {
        loop {
            match rx.recv().unwrap() {
                WorkerResponse::Progress { .. } => continue,
                other => return other,
            }
        }
    }

    #[test]
    fn worker_shutdown() {
        let (cmd_tx, _rx, handle) = spawn(Box::new(MemoryWarehouse::default()));
        cmd_tx.send(WorkerCommand::Shutdown).unwrap();
        handle.join().expect("worker should join cleanly");
    }

    #[test]
    fn failed_run_reports_tagged_error() {
        let (cmd_tx, rx, handle) = spawn(Box::new(MemoryWarehouse::default()));
        cmd_tx.send(WorkerCommand::Run { ticker: ticker("AAPL") }).unwrap();
        match final_response(&rx) {
            WorkerResponse::Failed { ticker: t, error } => {
                assert_eq!(t, ticker("AAPL"));
                assert_eq!(error.kind(), ErrorKind::InsufficientData);
            }
            other => panic!("expected failure, got {other:?}"),
        }
        cmd_tx.send(WorkerCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn successful_run_sends_progress_then_report() {
        let (cmd_tx, rx, handle) = spawn(Box::new(SyntheticWarehouse::new(1, 60)));
        cmd_tx.send(WorkerCommand::Run { ticker: ticker("TSLA") }).unwrap();

        match rx.recv().unwrap() {
            WorkerResponse::Progress { stage, .. } => assert_eq!(stage, Stage::Loading),
            other => panic!("expected progress first, got {other:?}"),
        }
        match final_response(&rx) {
            WorkerResponse::Done { ticker: t, report } => {
                assert_eq!(t, ticker("TSLA"));
                assert_eq!(report.forecast.points.len(), 30);
            }
            other => panic!("expected report, got {other:?}"),
        }
        cmd_tx.send(WorkerCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn worker_uses_private_pool() {
        let global_threads = rayon::current_num_threads();
        let (cmd_tx, _rx, handle) = spawn(Box::new(MemoryWarehouse::default()));
        assert_eq!(rayon::current_num_threads(), global_threads);
        cmd_tx.send(WorkerCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }
}
