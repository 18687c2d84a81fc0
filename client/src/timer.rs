use futures::future::LocalBoxFuture;
use std::time::Duration;

/// Suspension source for polling and deadlines
///
/// The browser build sleeps on `setTimeout`, tests sleep on the tokio clock.
pub trait Timer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}
