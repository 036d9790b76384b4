//! Front ends
//!
//! Both front ends reduce to `QueryOrchestrator::process_query` calls:
//! the console under the fixed conversation id `console`, network clients
//! under their session token or, failing that, their peer address.
//!
//! [`run_until_first_exit`] runs them side by side; whichever finishes
//! first cancels the other, then every provider is disconnected.

mod console;
mod network;
mod payload;

use std::io;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::logging::{Logger, LoggerExt};
use crate::registry::ProviderRegistry;
use crate::types::CancellationToken;

pub use console::{ConsoleCommand, ConsoleFrontEnd, CONSOLE_CONVERSATION};
pub use network::{NetworkFrontEnd, MAX_FRAME_BYTES};
pub use payload::{parse_payload, timestamp, PayloadError, QueryRequest, Response, QUERY_PREFIX};

/// A front end's main loop; it must return once `cancel` fires
pub type FrontEndTask<'a> = BoxFuture<'a, io::Result<()>>;

/// Run the console and the listener until the first one exits.
///
/// A missing front end simply waits for cancellation. Errors from both
/// sides are logged; the first one is returned.
pub async fn run_until_first_exit(
    console: Option<FrontEndTask<'_>>,
    listener: Option<FrontEndTask<'_>>,
    cancel: CancellationToken,
    registry: Arc<ProviderRegistry>,
    logger: Arc<dyn Logger>,
) -> io::Result<()> {
    let idle = |cancel: CancellationToken| -> FrontEndTask<'static> {
        Box::pin(async move {
            cancel.cancelled().await;
            Ok(())
        })
    };
    let mut console = console.unwrap_or_else(|| idle(cancel.clone()));
    let mut listener = listener.unwrap_or_else(|| idle(cancel.clone()));

    let (console_first, result) = tokio::select! {
        result = &mut console => (true, result),
        result = &mut listener => (false, result),
    };
    cancel.cancel();

    let (first, second) = if console_first {
        logger.info("[FrontEnd] Console finished, stopping listener");
        (result, listener.await)
    } else {
        logger.info("[FrontEnd] Listener finished, stopping console");
        (result, console.await)
    };

    for result in [&first, &second] {
        if let Err(e) = result {
            logger.error_fmt(format_args!("[FrontEnd] {}", e));
        }
    }

    registry.disconnect_all().await;
    first.and(second)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{MemoryLogger, NoOpLogger};
    use crate::registry::testing::FakeProvider;

    #[tokio::test]
    async fn test_first_exit_cancels_other_and_disconnects() {
        let registry = Arc::new(ProviderRegistry::new(Arc::new(NoOpLogger)));
        let provider = Arc::new(FakeProvider::with_tools(&[]));
        registry.register("p", provider.clone()).unwrap();

        let cancel = CancellationToken::new();
        let waiting = cancel.clone();
        let listener: FrontEndTask<'_> = Box::pin(async move {
            waiting.cancelled().await;
            Ok(())
        });
        let console: FrontEndTask<'_> = Box::pin(async { Ok(()) });

        run_until_first_exit(
            Some(console),
            Some(listener),
            cancel.clone(),
            registry,
            Arc::new(NoOpLogger),
        )
        .await
        .unwrap();

        assert!(cancel.is_cancelled());
        assert!(provider.is_closed());
    }

    #[tokio::test]
    async fn test_missing_console_waits_for_listener() {
        let registry = Arc::new(ProviderRegistry::new(Arc::new(NoOpLogger)));
        let logger = Arc::new(MemoryLogger::new());
        let listener: FrontEndTask<'_> =
            Box::pin(async { Err(io::Error::new(io::ErrorKind::AddrInUse, "port taken")) });

        let result = run_until_first_exit(
            None,
            Some(listener),
            CancellationToken::new(),
            registry,
            logger.clone(),
        )
        .await;

        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::AddrInUse);
        assert!(logger.contains("port taken"));
    }
}
