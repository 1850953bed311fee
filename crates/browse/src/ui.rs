//! The UI-affine executor.
//!
//! Everything a bound list observes (visible rows, progress, flags, selection)
//! is written from exactly one thread. Background work hands its results back
//! through [`UiExecutor::dispatch`] or [`UiExecutor::run`]; jobs run in the
//! order they were posted.

use std::thread::{self, JoinHandle, ThreadId};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Clone)]
pub struct UiExecutor {
    tx: mpsc::UnboundedSender<Job>,
    thread_id: ThreadId,
}

/// Owner of the UI loop thread. The loop ends once every [`UiExecutor`] clone
/// has been dropped.
pub struct UiThread {
    handle: Option<JoinHandle<()>>,
}

impl UiExecutor {
    pub fn spawn(name: &str) -> Result<(Self, UiThread), DispatchError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let loop_name = name.to_string();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    job();
                }
                debug!("UI loop {} stopped", loop_name);
            })?;
        let thread_id = handle.thread().id();
        Ok((
            Self { tx, thread_id },
            UiThread {
                handle: Some(handle),
            },
        ))
    }

    pub fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Run `job` on the UI thread: inline when already there, queued
    /// otherwise.
    pub fn dispatch<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_ui_thread() {
            job();
            return;
        }
        if self.tx.send(Box::new(job)).is_err() {
            warn!("UI loop is gone; dropping job");
        }
    }

    /// Queue `job` on the UI thread and wait for its result.
    pub async fn run<F, R>(&self, job: F) -> Result<R, DispatchError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_ui_thread() {
            return Ok(job());
        }
        let (result_tx, result_rx) = oneshot::channel();
        self.tx
            .send(Box::new(move || {
                let _ = result_tx.send(job());
            }))
            .map_err(|_| DispatchError::Closed)?;
        result_rx.await.map_err(|_| DispatchError::Closed)
    }

    /// Resolves once every job queued before this call has run.
    pub async fn flush(&self) -> Result<(), DispatchError> {
        self.run(|| ()).await
    }
}

impl UiThread {
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("UI loop panicked");
            }
        }
    }
}

#[derive(Debug)]
pub enum DispatchError {
    Closed,
    Spawn(std::io::Error),
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::Closed => write!(f, "ui loop closed"),
            DispatchError::Spawn(err) => write!(f, "failed to start ui loop: {}", err),
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<std::io::Error> for DispatchError {
    fn from(err: std::io::Error) -> Self {
        DispatchError::Spawn(err)
    }
}

#[cfg(test)]
mod tests {
    use super::UiExecutor;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[tokio::test]
    async fn run_executes_on_ui_thread() {
        let (ui, _thread) = UiExecutor::spawn("ui-test").unwrap();
        let executor = ui.clone();
        let on_ui = ui.run(move || executor.is_ui_thread()).await.unwrap();
        assert!(on_ui);
        assert!(!ui.is_ui_thread());
    }

    #[tokio::test]
    async fn jobs_run_in_post_order() {
        let (ui, _thread) = UiExecutor::spawn("ui-order").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for value in 0..20 {
            let seen = Arc::clone(&seen);
            ui.dispatch(move || seen.lock().push(value));
        }
        ui.flush().await.unwrap();
        assert_eq!(*seen.lock(), (0..20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn dispatch_from_ui_thread_runs_inline() {
        let (ui, _thread) = UiExecutor::spawn("ui-inline").unwrap();
        let inner = ui.clone();
        let order = ui
            .run(move || {
                let seen = Arc::new(Mutex::new(Vec::new()));
                let nested = Arc::clone(&seen);
                inner.dispatch(move || nested.lock().push("nested"));
                seen.lock().push("after");
                let out = seen.lock().clone();
                out
            })
            .await
            .unwrap();
        assert_eq!(order, vec!["nested", "after"]);
    }

    #[test]
    fn loop_stops_when_executors_drop() {
        let (ui, thread) = UiExecutor::spawn("ui-stop").unwrap();
        drop(ui);
        thread.join();
    }
}
