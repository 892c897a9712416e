use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::events::{EventHandler, EventProducer, Handler, OrderPaidEvent, OrderStatusChangedEvent};

type BoxedHook<E> = Box<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// The producer side of every registered hook. API objects hold one of these and publish into it.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_paid_producers: Vec<EventProducer<OrderPaidEvent>>,
    pub status_changed_producers: Vec<EventProducer<OrderStatusChangedEvent>>,
}

impl EventProducers {
    pub async fn publish_order_paid(&self, event: OrderPaidEvent) {
        for producer in &self.order_paid_producers {
            trace!("📬️ Publishing order paid event for {}", event.order.order_number);
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_status_changed(&self, event: OrderStatusChangedEvent) {
        for producer in &self.status_changed_producers {
            trace!("📬️ Publishing status change {} -> {}", event.old_status, event.new_status());
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_paid: Option<EventHandler<OrderPaidEvent>>,
    pub on_status_changed: Option<EventHandler<OrderStatusChangedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_paid = hooks.on_order_paid.map(|f| EventHandler::new(buffer_size, f));
        let on_status_changed = hooks.on_status_changed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_paid, on_status_changed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_paid {
            result.order_paid_producers.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_status_changed {
            result.status_changed_producers.push(handler.subscribe());
        }
        result
    }

    /// Spawns a task per registered handler. Each task ends when all of its producers have been dropped.
    pub fn start_handlers(self) {
        if let Some(handler) = self.on_order_paid {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_status_changed {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_status_changed: Option<Handler<OrderStatusChangedEvent>>,
}

impl EventHooks {
    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: Fn(OrderPaidEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static {
        let hook: BoxedHook<OrderPaidEvent> = Box::new(f);
        self.on_order_paid = Some(Arc::from(hook));
        self
    }

    pub fn on_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: Fn(OrderStatusChangedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static {
        let hook: BoxedHook<OrderStatusChangedEvent> = Box::new(f);
        self.on_status_changed = Some(Arc::from(hook));
        self
    }
}
