use futures::future::LocalBoxFuture;
use staircase_client::Timer;
use std::time::Duration;

/// `setTimeout`-backed sleeps for confirmation polling
pub struct GlooTimer;

impl Timer for GlooTimer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        let millis = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        Box::pin(gloo_timers::future::TimeoutFuture::new(millis))
    }
}
