//! The [`Context`] is a general purpose immutable container to carry request scoped values around.
//!
//! Identity lookups are performed on behalf of a single registry authentication request.
//! The context attached to such lookups provides:
//!
//! - The [`Logger`] to emit events with, decorated with the request correlation ID.
//! - A cancellation token the caller can trigger to abandon the lookup.
//! - An optional deadline after which the lookup must give up.
//!
//! Contexts are organised into a tree structure:
//!
//! - A root context represents the general process wide scope.
//! - Derived contexts represents a narrower scope within their parent with additional
//!   or updated information attached to them.
//!
//! Cancelling a context also cancels every context derived from it and a derived context
//! can never extend the deadline of its parent.
use std::future::Future;
use std::time::Duration;

use slog::Logger;
use slog::OwnedKV;
use slog::SendSyncRefUnwindSafeKV;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// An operation was abandoned before it could complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Interrupted {
    /// The context was cancelled.
    #[error("the operation was cancelled before completion")]
    Cancelled,

    /// The context deadline passed.
    #[error("the operation did not complete before the context deadline")]
    DeadlineExceeded,
}

/// The [`Context`] is a general purpose container to carry scoped values around.
///
/// Refer to the [crate level docs](crate) for details.
#[derive(Clone, Debug)]
pub struct Context {
    /// Token to cooperatively cancel operations running on behalf of this context.
    pub cancel: CancellationToken,

    /// Point in time after which operations for this context should give up.
    pub deadline: Option<Instant>,

    /// Logger with contextual attributes attached to it.
    pub logger: Logger,

    /// Correlation ID of the request this context was derived for.
    ///
    /// The ID is only meant to correlate log events and must not be used to make decisions.
    pub request_id: Option<Uuid>,
}

impl Context {
    /// Derive a new [`Context`] by making changes to the current one.
    pub fn derive(&self) -> ContextBuilder {
        ContextBuilder {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
            logger: self.logger.clone(),
            request_id: self.request_id,
        }
    }

    /// Derive a new [`Context`] by making changes to the current one using the provided callback.
    pub fn derive_with<F>(&self, callback: F) -> Context
    where
        F: FnOnce(ContextBuilder) -> ContextBuilder,
    {
        let builder = callback(self.derive());
        builder.build()
    }

    /// Check if the context was cancelled or its deadline has passed.
    pub fn interrupted(&self) -> Option<Interrupted> {
        if self.cancel.is_cancelled() {
            return Some(Interrupted::Cancelled);
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Some(Interrupted::DeadlineExceeded),
            _ => None,
        }
    }

    /// Initialise a new root context with no values attached.
    pub fn root(logger: Logger) -> ContextBuilder {
        ContextBuilder {
            cancel: CancellationToken::new(),
            deadline: None,
            logger,
            request_id: None,
        }
    }

    /// Drive a future to completion unless the context is cancelled or its deadline passes first.
    ///
    /// When the context is interrupted the future is dropped, which releases any resource
    /// (such as network connections) it was holding.
    /// Interruptions are checked before the future is polled so a context that is already
    /// cancelled or expired never starts the operation.
    pub async fn run<F>(&self, future: F) -> Result<F::Output, Interrupted>
    where
        F: Future,
    {
        if let Some(interrupted) = self.interrupted() {
            return Err(interrupted);
        }

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupted::Cancelled),
            _ = deadline => Err(Interrupted::DeadlineExceeded),
            output = future => Ok(output),
        }
    }
}

/// A builder for root and derived contexts.
pub struct ContextBuilder {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    logger: Logger,
    request_id: Option<Uuid>,
}

impl ContextBuilder {
    /// Finalise the build process and return a new [`Context`].
    pub fn build(self) -> Context {
        Context {
            cancel: self.cancel,
            deadline: self.deadline,
            logger: self.logger,
            request_id: self.request_id,
        }
    }

    /// Set a deadline for the context, unless the current deadline is sooner.
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = match self.deadline {
            Some(current) if current <= deadline => Some(current),
            _ => Some(deadline),
        };
        self
    }

    /// Update the [`Context`] logger to attach new log key/pair values.
    pub fn log_values<T>(mut self, entries: OwnedKV<T>) -> Self
    where
        T: SendSyncRefUnwindSafeKV + 'static,
    {
        self.logger = self.logger.new(entries);
        self
    }

    /// Attach a request correlation ID to the context and its logger.
    pub fn request_id(mut self, id: Uuid) -> Self {
        self.request_id = Some(id);
        self.log_values(slog::o!("request_id" => id.to_string()))
    }

    /// Set the context deadline to the given amount of time from now.
    ///
    /// Like [`ContextBuilder::deadline`] this never extends an existing deadline.
    pub fn timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.deadline(deadline)
    }
}

#[cfg(any(test, feature = "test-fixture"))]
impl Context {
    /// Create an empty context useful for test.
    pub fn fixture() -> Context {
        let logger = Logger::root(slog::Discard, slog::o!());
        Context::root(logger).build()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;
    use uuid::Uuid;

    use super::Context;
    use super::Interrupted;

    const LONG: Duration = Duration::from_secs(10);
    const SHORT: Duration = Duration::from_millis(50);

    #[test]
    fn derive_log_attributes() {
        let root = Context::fixture();
        let parent = root
            .derive()
            .log_values(slog::o!("root" => "value", "test" => "root"))
            .build();
        let context = parent
            .derive()
            .log_values(slog::o!("test" => "override"))
            .build();
        assert_eq!(format!("{:?}", context.logger.list()), "(test, test, root)");
    }

    #[test]
    fn derive_noop() {
        let parent = Context::fixture();
        let context = parent.derive().build();
        assert_eq!(
            format!("{:?}", parent.logger.list()),
            format!("{:?}", context.logger.list()),
        );
        assert_eq!(context.request_id, None);
        assert_eq!(context.deadline, None);
    }

    #[test]
    fn derive_request_id() {
        let id = Uuid::new_v4();
        let context = Context::fixture().derive().request_id(id).build();
        assert_eq!(context.request_id, Some(id));
        assert_eq!(format!("{:?}", context.logger.list()), "(request_id)");

        let child = context.derive().build();
        assert_eq!(child.request_id, Some(id));
    }

    #[test]
    fn cancel_parent_cancels_children() {
        let parent = Context::fixture();
        let child = parent.derive().build();
        parent.cancel.cancel();
        assert_eq!(child.interrupted(), Some(Interrupted::Cancelled));
    }

    #[test]
    fn cancel_child_keeps_parent() {
        let parent = Context::fixture();
        let child = parent.derive().build();
        child.cancel.cancel();
        assert_eq!(parent.interrupted(), None);
    }

    #[tokio::test]
    async fn deadline_never_extended() {
        let parent = Context::fixture().derive().timeout(SHORT).build();
        let child = parent.derive().timeout(LONG).build();
        assert_eq!(child.deadline, parent.deadline);

        let sooner = Instant::now();
        let child = parent.derive().deadline(sooner).build();
        assert_eq!(child.deadline, Some(sooner));
    }

    #[tokio::test]
    async fn run_completes() {
        let context = Context::fixture().derive().timeout(LONG).build();
        let result = context.run(async { 42 }).await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn run_already_cancelled() {
        let context = Context::fixture();
        context.cancel.cancel();
        let result = context.run(async { 42 }).await;
        assert_eq!(result, Err(Interrupted::Cancelled));
    }

    #[tokio::test]
    async fn run_already_expired() {
        let context = Context::fixture()
            .derive()
            .deadline(Instant::now() - SHORT)
            .build();
        let result = context.run(async { 42 }).await;
        assert_eq!(result, Err(Interrupted::DeadlineExceeded));
    }

    #[tokio::test]
    async fn run_cancelled_while_pending() {
        let context = Context::fixture();
        let cancel = context.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(SHORT).await;
            cancel.cancel();
        });

        let start = Instant::now();
        let result = context.run(tokio::time::sleep(LONG)).await;
        assert_eq!(result, Err(Interrupted::Cancelled));
        assert!(start.elapsed() < LONG);
    }

    #[tokio::test]
    async fn run_deadline_while_pending() {
        let context = Context::fixture().derive().timeout(SHORT).build();
        let start = Instant::now();
        let result = context.run(tokio::time::sleep(LONG)).await;
        assert_eq!(result, Err(Interrupted::DeadlineExceeded));
        assert!(start.elapsed() < LONG);
    }
}
