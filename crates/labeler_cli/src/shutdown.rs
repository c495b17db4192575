use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use console::Term;

/// Global shutdown flag, shared with the download pipeline.
static SHUTDOWN_REQUESTED: LazyLock<Arc<AtomicBool>> =
    LazyLock::new(|| Arc::new(AtomicBool::new(false)));

/// The flag to hand to `DownloadOptions::shutdown`.
pub(crate) fn shutdown_flag() -> Arc<AtomicBool> {
    Arc::clone(&SHUTDOWN_REQUESTED)
}

#[inline]
fn request_shutdown() {
    SHUTDOWN_REQUESTED.store(true, Ordering::Release);
}

/// Set up the Ctrl+C handler for graceful shutdown.
///
/// The first Ctrl+C stops the download at the next unit of work so the
/// corpus can still be written; the second exits immediately.
pub(crate) fn setup_shutdown_handler() {
    tokio::spawn(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            return;
        }

        let is_tty = Term::stdout().is_term();
        if is_tty {
            eprintln!("\n\nShutdown requested, writing the corpus collected so far...");
            eprintln!("Press Ctrl+C again to force quit.");
        } else {
            tracing::warn!("Shutdown requested, writing the corpus collected so far");
        }

        request_shutdown();

        if tokio::signal::ctrl_c().await.is_ok() {
            if is_tty {
                eprintln!("Force quit!");
            }
            std::process::exit(130);
        }
    });
}
