// src/lib.rs
pub mod audit;
pub mod conn;
pub mod error;
pub mod handlers;
pub mod http;
pub mod io;
pub mod listener;
pub mod locks;
pub mod logging;
pub mod parser;
pub mod queue;
pub mod server;
pub mod syscalls;
pub mod worker;

// Re-exports for users
pub use audit::AuditLog;
pub use error::{Error, Result};
pub use http::{Method, Response};
pub use locks::UriLocks;
pub use queue::BoundedQueue;
pub use server::{Server, ServerState};
