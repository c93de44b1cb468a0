//! Execution context for storage operations
//!
//! Every storage operation takes a [`Context`] and must reject the call
//! before issuing any I/O when the context is no longer valid. The context
//! wraps a [`CancellationToken`] so callers can share one token between the
//! storage facade and the rest of their request handling.

use tokio_util::sync::CancellationToken;

use crate::error::{StorageError, StorageResult};

/// Cancellation scope passed to every storage operation.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
}

impl Context {
    /// Creates a live context that is never cancelled by the facade itself.
    pub fn background() -> Self {
        Self::default()
    }

    /// Creates a context driven by an externally owned token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Creates a context that is already invalid. Useful in tests and for
    /// callers that want to fail pending calls deterministically.
    pub fn cancelled() -> Self {
        let token = CancellationToken::new();
        token.cancel();
        Self { token }
    }

    /// Cancels this context; subsequent operations fail with
    /// [`StorageError::InvalidContext`].
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns [`StorageError::InvalidContext`] when the context is no
    /// longer valid. Adapters call this before touching any backend.
    pub fn ensure_valid(&self) -> StorageResult<()> {
        if self.token.is_cancelled() {
            return Err(StorageError::InvalidContext);
        }
        Ok(())
    }
}
