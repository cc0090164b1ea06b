//! Background scan pool
//!
//! Scans run on a fixed-size rayon thread pool. Each submitted scan delivers
//! its result exactly once over a one-shot channel; a scan that panics is
//! reported as [`ScanError::WorkerPanicked`] rather than losing its result.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use ivault_core::{IvaultError, IvaultResult};
use ivault_snapshot::Inode;
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::error::ScanError;
use crate::scanner::{CancelHandle, InodeScanner};

type ScanResult = Result<Inode, ScanError>;

pub struct ScanPool {
    pool: rayon::ThreadPool,
}

impl ScanPool {
    /// Start `workers` scan threads (0 = available parallelism).
    pub fn new(workers: usize) -> IvaultResult<Self> {
        let workers = if workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            workers
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("ivault-scan-{i}"))
            .build()
            .map_err(|e| IvaultError::Config(format!("starting scan pool: {e}")))?;
        info!(workers, "scan pool ready");
        Ok(Self { pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queue `scanner` and return a handle to its eventual result.
    pub fn submit(&self, scanner: InodeScanner) -> ScanTask {
        let (tx, rx) = oneshot::channel();
        let path = scanner.path().to_path_buf();
        let cancel = scanner.cancel_handle();

        self.pool.spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| scanner.scan()))
                .unwrap_or_else(|payload| {
                    let message = panic_message(payload.as_ref());
                    error!(path = %scanner.path().display(), "scan panicked: {message}");
                    Err(ScanError::WorkerPanicked {
                        path: scanner.path().to_path_buf(),
                        message,
                    })
                });
            // A dropped ScanTask means nobody is waiting for the result
            let _ = tx.send(result);
        });

        ScanTask { path, cancel, rx }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// A submitted scan. Yields the scan's result once.
pub struct ScanTask {
    path: PathBuf,
    cancel: CancelHandle,
    rx: oneshot::Receiver<ScanResult>,
}

impl ScanTask {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Ask the scan to stop; it then completes with `ScanAborted`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Block the current thread until the scan completes.
    ///
    /// Must not be called from within an async runtime; use [`join`](Self::join).
    pub fn wait(self) -> ScanResult {
        let path = self.path;
        self.rx
            .blocking_recv()
            .unwrap_or_else(|_| Err(channel_closed(path)))
    }

    pub async fn join(self) -> ScanResult {
        let path = self.path;
        self.rx.await.unwrap_or_else(|_| Err(channel_closed(path)))
    }
}

fn channel_closed(path: PathBuf) -> ScanError {
    ScanError::WorkerPanicked {
        path,
        message: "scan worker exited without a result".into(),
    }
}
