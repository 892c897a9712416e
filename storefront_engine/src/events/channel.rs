//! A small pub-sub channel for storefront events.
//!
//! Handlers only ever see the event. They have no access to the engine's state, but they may be async, and several
//! events can be in flight at once.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    receiver: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        Self { receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer { sender: self.sender.clone() }
    }

    /// Runs until every producer has been dropped, then waits for in-flight handlers before returning.
    pub async fn start_handler(self) {
        let Self { mut receiver, sender, handler } = self;
        // Our own sender must go, or the channel never closes.
        drop(sender);
        debug!("📬️ Event handler started");
        let mut running = JoinSet::new();
        while let Some(event) = receiver.recv().await {
            let handler = Arc::clone(&handler);
            running.spawn(async move { (handler)(event).await });
            while let Some(done) = running.try_join_next() {
                if let Err(e) = done {
                    warn!("📬️ An event handler panicked. {e}");
                }
            }
        }
        trace!("📬️ All producers are gone. Waiting for {} running handlers", running.len());
        while let Some(done) = running.join_next().await {
            if let Err(e) = done {
                warn!("📬️ An event handler panicked. {e}");
            }
        }
        debug!("📬️ Event handler has shut down");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to publish event: {e}");
        }
    }
}
