//! Long-running jobs spawned next to the HTTP server. Each accepts a
//! [`CancellationToken`](tokio_util::sync::CancellationToken) and returns
//! once it is cancelled.

pub mod token_cleanup;
