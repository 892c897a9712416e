//! # The checkout pipeline
//!
//! `CheckoutApi` turns a cart into a paid order:
//!
//! 1. The request is validated and the cart is priced against the current shipping policy.
//! 2. A pre-flight read rejects carts that obviously cannot be filled, before anything is written.
//! 3. The stock for every product in the cart is set aside (a [`StockReservation`]) and the order is stored as
//!    `Pending`. Checkouts of the same product queue behind each other from here until step 5, so the last unit of a
//!    product can only ever be sold once. Checkouts of other products are not held up.
//! 4. The payment gateway is called, bounded by the configured timeout.
//! 5. On success the stock is taken with a conditional update, the `Sold` stock logs are written and the order is
//!    marked `Paid`, all in one transaction. Any other outcome releases the stock and leaves the order `Pending`.
//!
//! A clash on the order number, or a busy database, abandons the attempt and starts again with a fresh order number,
//! up to `max_attempts` times.
use std::{fmt::Debug, time::Duration};

use log::*;

use crate::{
    cart::{Cart, CartStore},
    db_types::{NewOrder, NewOrderItem, Order, OrderNumber, OrderStatusType, ShippingInfo},
    events::{EventProducers, OrderPaidEvent},
    order_number::OrderNumberGenerator,
    payment::{CaptureInfo, PaymentGateway, PaymentRequest},
    pricing::{compute_totals, ShippingPolicy},
    sf_api::{errors::CheckoutError, order_objects::OrderWithItems},
    traits::{PaymentReceipt, SessionStore, StockReservation, StoreError, StorefrontDatabase},
};

pub const PAYMENT_METHOD: &str = "Online";
pub const DEFAULT_PAYMENT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CHECKOUT_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutConfig {
    /// Upper bound on a single gateway call.
    pub payment_timeout: Duration,
    /// How many times a checkout is attempted when it loses a race with a concurrent write.
    pub max_attempts: u32,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self { payment_timeout: DEFAULT_PAYMENT_TIMEOUT, max_attempts: DEFAULT_CHECKOUT_ATTEMPTS }
    }
}

/// Everything the customer submits at checkout, apart from the cart itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub user_id: String,
    pub customer_email: String,
    pub shipping: ShippingInfo,
}

impl CheckoutRequest {
    pub fn new<S: Into<String>>(user_id: S, customer_email: S, shipping: ShippingInfo) -> Self {
        Self { user_id: user_id.into(), customer_email: customer_email.into(), shipping }
    }
}

enum PaymentOutcome {
    Approved(String),
    Declined(String),
    TimedOut,
    Unavailable(String),
}

pub struct CheckoutApi<B, G> {
    db: B,
    gateway: G,
    numbers: OrderNumberGenerator,
    config: CheckoutConfig,
    producers: EventProducers,
}

impl<B, G> Debug for CheckoutApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi ({:?})", self.config)
    }
}

impl<B, G> CheckoutApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        Self { db, gateway, numbers: OrderNumberGenerator::default(), config: CheckoutConfig::default(), producers }
    }

    pub fn with_config(mut self, config: CheckoutConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_order_numbers(mut self, numbers: OrderNumberGenerator) -> Self {
        self.numbers = numbers;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }
}

impl<B, G> CheckoutApi<B, G>
where
    B: StorefrontDatabase,
    G: PaymentGateway,
{
    /// Prices `cart` and turns it into an unsaved order. The order number is left empty; one is drawn for each
    /// attempt to store the order.
    ///
    /// Item names and prices come from the cart snapshot, so later catalog changes never alter this order.
    pub fn build_order(
        &self,
        cart: &Cart,
        request: &CheckoutRequest,
        policy: &ShippingPolicy,
    ) -> Result<NewOrder, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        if let Some(entry) = cart.entries().iter().find(|e| e.quantity < 1) {
            return Err(CheckoutError::ValidationError(format!(
                "Quantity for product {} must be at least 1",
                entry.product_id
            )));
        }
        let missing = request.shipping.missing_fields();
        if !missing.is_empty() {
            return Err(CheckoutError::ValidationError(format!("Missing shipping fields: {}", missing.join(", "))));
        }
        if request.user_id.trim().is_empty() {
            return Err(CheckoutError::ValidationError("A user id is required".into()));
        }
        if !request.customer_email.contains('@') {
            return Err(CheckoutError::ValidationError(format!(
                "'{}' is not a valid email address",
                request.customer_email
            )));
        }
        let totals = compute_totals(cart.entries(), policy);
        let items = cart
            .entries()
            .iter()
            .map(|e| NewOrderItem {
                product_id: e.product_id,
                product_name: e.product_name.clone(),
                unit_price: e.unit_price,
                quantity: e.quantity,
            })
            .collect();
        let order = NewOrder {
            order_number: OrderNumber::default(),
            user_id: request.user_id.trim().to_string(),
            sub_total: totals.sub_total,
            shipping_cost: totals.shipping_cost,
            discount: totals.discount,
            tax: totals.tax,
            total_amount: totals.total,
            shipping: request.shipping.normalized(),
            payment_method: Some(PAYMENT_METHOD.to_string()),
            items,
        };
        if !order.totals_are_consistent() {
            error!("📦️ Priced order does not add up: {order:?}");
            return Err(CheckoutError::ValidationError("Order totals are inconsistent".into()));
        }
        Ok(order)
    }

    /// Checks out the cart stored in the session, and empties the cart once an order has been stored.
    ///
    /// The cart is kept if no order was created, e.g. when stock ran out, so that the customer can adjust it.
    pub async fn checkout_session<S: SessionStore>(
        &self,
        carts: &CartStore<S>,
        session_id: &str,
        request: CheckoutRequest,
    ) -> Result<OrderWithItems, CheckoutError> {
        let cart = carts.load(session_id).await?;
        let result = self.checkout(&cart, request).await;
        let order_was_stored = match &result {
            Ok(_) => true,
            Err(e) => e.is_recoverable() && !matches!(e, CheckoutError::PersistenceConflict(_)),
        };
        if order_was_stored {
            if let Err(e) = carts.clear(session_id).await {
                warn!("🛒️ Order was stored but the cart could not be cleared. {e}");
            }
        }
        result
    }

    /// Runs the whole pipeline for `cart`.
    ///
    /// ## Returns
    /// The paid order and its items.
    ///
    /// ## Failure modes
    /// * `EmptyCart` or `ValidationError`: nothing is stored.
    /// * `InsufficientStock` or `ProductUnavailable`: nothing is stored.
    /// * `PaymentDeclined`, `PaymentTimeout` or `PaymentUnavailable`: the order is stored as `Pending` and stock is
    ///   untouched. Retry with [`Self::retry_payment`], or reconcile with [`Self::reconcile_payment`].
    /// * `PersistenceConflict`: every attempt lost a race with a concurrent write. Nothing is stored.
    pub async fn checkout(&self, cart: &Cart, request: CheckoutRequest) -> Result<OrderWithItems, CheckoutError> {
        let policy = self.db.fetch_shipping_policy().await?;
        let template = self.build_order(cart, &request, &policy)?;
        self.check_stock(cart).await?;
        let mut attempt = 0;
        let reservation = loop {
            attempt += 1;
            let mut order = template.clone();
            order.order_number = self.numbers.next_number();
            let order_number = order.order_number.clone();
            match self.db.reserve_new_order(order).await {
                Ok(reservation) => break reservation,
                Err(e) if is_retryable(&e) && attempt < self.config.max_attempts => {
                    warn!("📦️ Attempt {attempt} to store order {order_number} failed. Retrying. {e}");
                },
                Err(e) if is_retryable(&e) => {
                    warn!("📦️ Giving up on checkout for {} after {attempt} attempts. {e}", request.user_id);
                    return Err(CheckoutError::PersistenceConflict(e.to_string()));
                },
                Err(e) => {
                    debug!("📦️ Checkout for {} rejected. {e}", request.user_id);
                    return Err(e.into());
                },
            }
        };
        let order_number = reservation.order().order_number.clone();
        info!("📦️ Order {order_number} reserved for {}. Requesting payment of {}", request.user_id, template.total_amount);
        let outcome = self.request_payment(reservation.order(), &request.customer_email).await;
        match outcome {
            PaymentOutcome::Approved(txid) => self.commit(reservation, txid).await,
            failed => {
                reservation.release().await?;
                Err(payment_error(order_number, failed))
            },
        }
    }

    /// Pays for an order that is still `Pending`, e.g. after a declined card. No new order is created.
    pub async fn retry_payment(
        &self,
        order_number: &OrderNumber,
        customer_email: &str,
    ) -> Result<OrderWithItems, CheckoutError> {
        let order = self.fetch_order(order_number).await?;
        if order.status != OrderStatusType::Pending {
            return Err(CheckoutError::OrderNotPayable { order_number: order.order_number, status: order.status });
        }
        let reservation = self.reserve_pending(order_number).await?;
        info!("💳️ Retrying payment for order {order_number}");
        match self.request_payment(reservation.order(), customer_email).await {
            PaymentOutcome::Approved(txid) => self.commit(reservation, txid).await,
            failed => {
                reservation.release().await?;
                Err(payment_error(order_number.clone(), failed))
            },
        }
    }

    /// Reconciles a payment whose outcome was lost, typically to a gateway timeout.
    ///
    /// The gateway is asked what it captured under `transaction_id`. The capture is only accepted if it was taken for
    /// this order and covers its total. If it is, stock is taken and the order is marked `Paid` in one transaction.
    /// Confirming an order that is already paid with the same transaction id returns it unchanged.
    pub async fn confirm_payment(
        &self,
        order_number: &OrderNumber,
        transaction_id: &str,
    ) -> Result<OrderWithItems, CheckoutError> {
        let order = self.fetch_order(order_number).await?;
        if let Some(paid) = self.already_confirmed(&order, transaction_id).await? {
            return Ok(paid);
        }
        let Some(capture) = self.gateway.verify(transaction_id).await? else {
            warn!("💳️ Gateway does not know transaction {transaction_id} for order {order_number}");
            return Err(CheckoutError::PaymentNotVerified(transaction_id.to_string()));
        };
        self.settle(&order, capture).await
    }

    /// Like [`Self::confirm_payment`], but asks the gateway for whatever it captured for this order. A customer whose
    /// payment timed out never saw a transaction id, so this is the usual way to recover.
    pub async fn reconcile_payment(&self, order_number: &OrderNumber) -> Result<OrderWithItems, CheckoutError> {
        let order = self.fetch_order(order_number).await?;
        let Some(capture) = self.gateway.find_capture(order_number).await? else {
            if order.status != OrderStatusType::Pending {
                return Err(CheckoutError::OrderNotPayable { order_number: order.order_number, status: order.status });
            }
            debug!("💳️ Gateway holds no payment for order {order_number}");
            return Err(CheckoutError::NoCaptureFound(order_number.clone()));
        };
        if let Some(paid) = self.already_confirmed(&order, &capture.transaction_id).await? {
            return Ok(paid);
        }
        self.settle(&order, capture).await
    }

    /// Applies `capture` to the pending `order`.
    async fn settle(&self, order: &Order, capture: CaptureInfo) -> Result<OrderWithItems, CheckoutError> {
        let order_number = &order.order_number;
        let txid = capture.transaction_id.as_str();
        if !capture.pays_for(order_number, order.total_amount) {
            warn!(
                "💳️ Transaction {txid} was captured for {} ({}), not for order {order_number} ({}). Refusing to apply it",
                capture.order_reference, capture.amount, order.total_amount
            );
            return Err(CheckoutError::PaymentMismatch {
                transaction_id: capture.transaction_id,
                order_number: order_number.clone(),
            });
        }
        let reservation = match self.reserve_pending(order_number).await {
            Ok(r) => r,
            Err(CheckoutError::ValidationError(msg)) => {
                // Lost a race with another confirmation of the same payment.
                let order = self.fetch_order(order_number).await?;
                return match self.already_confirmed(&order, txid).await? {
                    Some(paid) => Ok(paid),
                    None => Err(CheckoutError::ValidationError(msg)),
                };
            },
            Err(e @ CheckoutError::InsufficientStock { .. }) => {
                error!(
                    "💳️ Transaction {txid} for order {order_number} was captured, but the stock is gone. The payment \
                     needs a manual refund."
                );
                return Err(e);
            },
            Err(e) => return Err(e),
        };
        self.commit(reservation, capture.transaction_id).await
    }

    async fn already_confirmed(
        &self,
        order: &Order,
        transaction_id: &str,
    ) -> Result<Option<OrderWithItems>, CheckoutError> {
        match order.status {
            OrderStatusType::Pending => Ok(None),
            _ if order.transaction_id.as_deref() == Some(transaction_id) => {
                debug!("💳️ Order {} is already confirmed with {transaction_id}", order.order_number);
                let items = self.db.fetch_order_items(order.id).await?;
                Ok(Some(OrderWithItems { order: order.clone(), items }))
            },
            status => Err(CheckoutError::OrderNotPayable { order_number: order.order_number.clone(), status }),
        }
    }

    async fn fetch_order(&self, order_number: &OrderNumber) -> Result<Order, CheckoutError> {
        self.db
            .fetch_order_by_number(order_number)
            .await?
            .ok_or_else(|| CheckoutError::OrderNotFound(order_number.clone()))
    }

    /// Rejects carts that cannot be filled from the stock on hand right now. The reservation re-checks atomically;
    /// this only saves a write for the common case.
    async fn check_stock(&self, cart: &Cart) -> Result<(), CheckoutError> {
        let ids = cart.entries().iter().map(|e| e.product_id).collect::<Vec<_>>();
        let products = self.db.fetch_products(&ids).await?;
        for entry in cart.entries() {
            let product = products
                .iter()
                .find(|p| p.id == entry.product_id && p.is_active)
                .ok_or(CheckoutError::ProductUnavailable(entry.product_id))?;
            if product.stock_quantity < entry.quantity {
                return Err(CheckoutError::InsufficientStock {
                    product_id: product.id,
                    requested: entry.quantity,
                    available: product.stock_quantity,
                });
            }
        }
        Ok(())
    }

    async fn reserve_pending(&self, order_number: &OrderNumber) -> Result<B::Reservation, CheckoutError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.db.reserve_pending_order(order_number).await {
                Ok(reservation) => return Ok(reservation),
                Err(e @ StoreError::WriteConflict(_)) if attempt < self.config.max_attempts => {
                    warn!("📦️ Attempt {attempt} to reserve stock for {order_number} failed. Retrying. {e}");
                },
                Err(e @ StoreError::WriteConflict(_)) => return Err(CheckoutError::PersistenceConflict(e.to_string())),
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn request_payment(&self, order: &Order, customer_email: &str) -> PaymentOutcome {
        let request = PaymentRequest::new(order.total_amount, order.order_number.clone(), customer_email)
            .with_description(format!("Order {}", order.order_number));
        let call = self.gateway.process(request);
        match tokio::time::timeout(self.config.payment_timeout, call).await {
            Ok(Ok(result)) if result.success => match result.transaction_id {
                Some(txid) => {
                    debug!("💳️ {} approved payment for {} as {txid}", self.gateway.name(), order.order_number);
                    PaymentOutcome::Approved(txid)
                },
                None => {
                    error!("💳️ {} approved {} without a transaction id", self.gateway.name(), order.order_number);
                    PaymentOutcome::Unavailable("The gateway approved the payment without a transaction id".into())
                },
            },
            Ok(Ok(result)) => {
                info!("💳️ Payment for {} was declined. {}", order.order_number, result.decline_reason());
                PaymentOutcome::Declined(result.decline_reason())
            },
            Ok(Err(e)) => {
                warn!("💳️ Payment for {} could not be processed. {e}", order.order_number);
                PaymentOutcome::Unavailable(e.to_string())
            },
            Err(_) => {
                warn!(
                    "💳️ {} did not answer within {:?} for order {}",
                    self.gateway.name(),
                    self.config.payment_timeout,
                    order.order_number
                );
                PaymentOutcome::TimedOut
            },
        }
    }

    async fn commit(&self, reservation: B::Reservation, txid: String) -> Result<OrderWithItems, CheckoutError> {
        let items = reservation.items().to_vec();
        let order_number = reservation.order().order_number.clone();
        let order = match reservation.commit_paid(PaymentReceipt::new(txid.clone(), PAYMENT_METHOD.to_string())).await {
            Ok(order) => order,
            Err(e) => {
                error!(
                    "💳️ Payment {txid} for order {order_number} was captured, but the order could not be committed. {e}"
                );
                return Err(e.into());
            },
        };
        info!("📦️ Order {} is paid ({} items, {})", order.order_number, items.len(), order.total_amount);
        self.producers.publish_order_paid(OrderPaidEvent::new(order.clone(), items.clone())).await;
        Ok(OrderWithItems { order, items })
    }
}

fn is_retryable(e: &StoreError) -> bool {
    matches!(e, StoreError::OrderNumberConflict(_) | StoreError::WriteConflict(_))
}

fn payment_error(order_number: OrderNumber, outcome: PaymentOutcome) -> CheckoutError {
    match outcome {
        PaymentOutcome::Declined(message) => CheckoutError::PaymentDeclined { order_number, message },
        PaymentOutcome::TimedOut => CheckoutError::PaymentTimeout { order_number },
        PaymentOutcome::Unavailable(msg) => CheckoutError::PaymentUnavailable(format!("Order {order_number}: {msg}")),
        PaymentOutcome::Approved(txid) => {
            CheckoutError::DatabaseError(format!("Payment {txid} for {order_number} was approved but not committed"))
        },
    }
}
