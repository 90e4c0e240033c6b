//! Cooperative cancellation for in-flight requests.
//!
//! Each predict or report dispatch carries a [`CancellationToken`]. The
//! controller keeps the matching [`CancellationSource`] and cancels it when
//! the request is superseded. Services poll the token before sending and
//! again before decoding, and report [`RemoteFailure::Cancelled`] when set.
//!
//! [`RemoteFailure::Cancelled`]: crate::error::RemoteFailure::Cancelled
//!
//! ```
//! use heartpanel_core::cancellation::CancellationSource;
//!
//! let source = CancellationSource::new();
//! let token = source.token();
//! assert!(!token.is_cancelled());
//! source.cancel();
//! assert!(token.is_cancelled());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Observer side: cheap to clone, safe to move into a worker thread.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<Shared>,
}

/// Control side. Dropping it does not cancel; call [`cancel`](Self::cancel).
pub struct CancellationSource {
    inner: Arc<Shared>,
}

struct Shared {
    cancelled: AtomicBool,
}

impl Shared {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            cancelled: AtomicBool::new(false),
        })
    }
}

impl CancellationSource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Shared::new(),
        }
    }

    #[must_use]
    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Signal every token of this source.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationSource")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancellationToken {
    /// A token that is never cancelled.
    #[must_use]
    pub fn never() -> Self {
        Self {
            inner: Shared::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
