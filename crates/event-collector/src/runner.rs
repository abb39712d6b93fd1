//! Concurrent process runner with graceful shutdown.
//!
//! Spawns named long-running processes, cancels all of them when any one
//! fails or a SIGTERM/SIGINT arrives, then runs closers under a timeout and
//! exits with a code reflecting the first failure.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub type AppProcess = Box<
    dyn FnOnce(CancellationToken) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>
        + Send,
>;

pub type Closer = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> + Send>;

pub struct Runner {
    processes: Vec<(String, AppProcess)>,
    closers: Vec<Closer>,
    closer_timeout: Duration,
    cancellation_token: CancellationToken,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    pub fn new() -> Self {
        Self {
            processes: Vec::new(),
            closers: Vec::new(),
            closer_timeout: Duration::from_secs(10),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Adds a named long-running process. Processes run concurrently; the
    /// first error cancels all of them.
    pub fn with_named_process<F, Fut>(mut self, name: impl Into<String>, process: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.processes
            .push((name.into(), Box::new(|token| Box::pin(process(token)))));
        self
    }

    /// Adds a cleanup function, executed after all processes have stopped.
    pub fn with_closer<F, Fut>(mut self, closer: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.closers.push(Box::new(|| Box::pin(closer())));
        self
    }

    pub fn with_closer_timeout(mut self, timeout: Duration) -> Self {
        self.closer_timeout = timeout;
        self
    }

    /// Runs until all processes stop, then exits the application.
    pub async fn run(self) {
        let token = self.cancellation_token;
        let mut join_set = JoinSet::new();

        for (name, process) in self.processes {
            let process_token = token.clone();
            join_set.spawn(async move {
                let result = process(process_token).await;
                (name, result)
            });
        }

        let signal_token = token.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("received interrupt signal");
                    signal_token.cancel();
                }
                Err(e) => {
                    error!(error = %e, "failed to install interrupt handler");
                }
            }
        });

        #[cfg(unix)]
        {
            let sigterm_token = token.clone();
            tokio::spawn(async move {
                use tokio::signal::unix::{signal, SignalKind};
                match signal(SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                        info!("received SIGTERM");
                        sigterm_token.cancel();
                    }
                    Err(e) => {
                        error!(error = %e, "failed to install SIGTERM handler");
                    }
                }
            });
        }

        let mut first_error = None;
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok((name, Ok(()))) => {
                    debug!(process = %name, "process completed");
                }
                Ok((name, Err(e))) => {
                    error!(process = %name, error = format!("{:#}", e), "process failed");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                    token.cancel();
                }
                Err(e) => {
                    error!(error = %e, "process panicked");
                    token.cancel();
                }
            }
        }

        join_set.shutdown().await;

        if !self.closers.is_empty() {
            let closer_timeout = self.closer_timeout;
            info!(timeout_secs = closer_timeout.as_secs(), "running closers");

            match tokio::time::timeout(closer_timeout, run_closers(self.closers)).await {
                Ok(()) => info!("all closers completed"),
                Err(_) => error!("closers timed out after {:?}", closer_timeout),
            }
        }

        if let Some(e) = first_error {
            error!(error = format!("{:#}", e), "exiting after failure");
            std::process::exit(1);
        }
        info!("exiting normally");
        std::process::exit(0);
    }
}

async fn run_closers(closers: Vec<Closer>) {
    let mut closer_set = JoinSet::new();

    for closer in closers {
        closer_set.spawn(async move { closer().await });
    }

    while let Some(result) = closer_set.join_next().await {
        match result {
            Ok(Ok(())) => debug!("closer completed"),
            Ok(Err(e)) => error!(error = format!("{:#}", e), "closer failed"),
            Err(e) => error!(error = %e, "closer panicked"),
        }
    }
}
