// src/server.rs
use crate::audit::AuditLog;
use crate::error::Result;
use crate::listener::Listener;
use crate::locks::UriLocks;
use crate::queue::BoundedQueue;
use crate::syscalls;
use crate::worker::Worker;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Hand-off queue slots per worker.
const QUEUE_SLOTS_PER_WORKER: usize = 3;

/// State shared by every worker: the per-URI lock registry and the audit
/// trail. Built once at startup and passed explicitly; no globals.
pub struct ServerState {
    pub locks: UriLocks,
    pub audit: AuditLog,
}

pub struct Server {
    port: u16,
    workers: usize,
    audit: Option<AuditLog>,
}

impl Server {
    pub fn bind(port: u16) -> Self {
        Self {
            port,
            workers: num_cpus::get(),
            audit: None,
        }
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Replace the stderr audit sink, mainly so tests can capture the trail.
    pub fn audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Run until SIGINT or SIGTERM.
    pub fn serve(self) -> Result<()> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_signal = shutdown.clone();
        ctrlc::set_handler(move || {
            shutdown_signal.store(true, Ordering::Release);
        })
        .expect("Error setting signal handler");

        self.run(shutdown)
    }

    /// Accept loop with an externally owned shutdown flag. `serve` wires
    /// the flag to SIGINT/SIGTERM; tests flip it directly.
    pub fn run(self, shutdown: Arc<AtomicBool>) -> Result<()> {
        syscalls::ignore_sigpipe();

        let listener = Listener::bind(self.port)?;
        let queue = Arc::new(BoundedQueue::new(self.workers * QUEUE_SLOTS_PER_WORKER));
        let state = Arc::new(ServerState {
            locks: UriLocks::new(),
            audit: self.audit.unwrap_or_else(AuditLog::stderr),
        });

        let core_ids = core_affinity::get_core_ids().unwrap_or_default();
        let mut handles = Vec::with_capacity(self.workers);
        for i in 0..self.workers {
            let core_id = if core_ids.is_empty() {
                None
            } else {
                core_ids.get(i % core_ids.len()).copied()
            };
            let worker = Worker::new(i, queue.clone(), state.clone());
            let handle = thread::Builder::new()
                .name(format!("larder-worker-{}", i))
                .spawn(move || {
                    if let Some(id) = core_id {
                        core_affinity::set_for_current(id);
                    }
                    worker.run();
                })?;
            handles.push(handle);
        }

        tracing::info!(port = self.port, workers = self.workers, "listening");

        while !shutdown.load(Ordering::Acquire) {
            match listener.accept() {
                Ok(Some(fd)) => {
                    // Ownership of the descriptor moves to whichever worker
                    // pops it. If the queue already closed, nobody will.
                    if !queue.push(fd) {
                        unsafe {
                            libc::close(fd);
                        }
                        break;
                    }
                }
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(error = %err, "accept failed");
                    continue;
                }
            }
        }

        // Stop accepting, let workers drain what was already queued, then
        // join them and flush the audit trail.
        tracing::info!("shutting down");
        queue.close();
        for handle in handles {
            let _ = handle.join();
        }
        state.audit.flush();
        Ok(())
    }
}
