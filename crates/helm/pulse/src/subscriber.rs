use async_trait::async_trait;
use helm_types::TickSignal;

use crate::error::SubscriberError;

/// Work performed once per tick.
///
/// A subscriber is never invoked again while its previous invocation is still
/// running; ticks that arrive in the meantime are coalesced (skipped).
#[async_trait]
pub trait TickSubscriber: Send + Sync {
    fn name(&self) -> &str;

    async fn on_tick(&self, tick: TickSignal) -> Result<(), SubscriberError>;
}

/// Adapter turning a synchronous closure into a [`TickSubscriber`].
pub struct FnSubscriber<F> {
    name: String,
    callback: F,
}

impl<F> FnSubscriber<F>
where
    F: Fn(TickSignal) -> Result<(), SubscriberError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, callback: F) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }
}

#[async_trait]
impl<F> TickSubscriber for FnSubscriber<F>
where
    F: Fn(TickSignal) -> Result<(), SubscriberError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_tick(&self, tick: TickSignal) -> Result<(), SubscriberError> {
        (self.callback)(tick)
    }
}
