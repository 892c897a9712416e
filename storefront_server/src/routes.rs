//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Database calls and payment gateway calls are always awaited, never
//! blocked on.
//!
//! Customer routes identify the caller with the [`Customer`] and [`SessionId`] extractors. Routes under `/admin` are
//! mounted in their own scope by the server; access to that scope is enforced in front of this server.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use storefront_engine::{
    db_types::{NewReview, OrderNumber},
    order_objects::OrderWithItems,
    traits::{CatalogManagement, InventoryManagement, OrderManagement, ReviewManagement, SessionStore, StorefrontDatabase},
    CartApi,
    CheckoutApi,
    CheckoutRequest,
    InventoryApi,
    OrderFlowApi,
    PaymentGateway,
    ReviewApi,
};

use crate::{
    data_objects::{
        AddToCartRequest,
        CheckoutParams,
        ConfirmPaymentParams,
        EligibilityResponse,
        JsonResponse,
        ModerationParams,
        OrderSearchParams,
        RetryPaymentParams,
        ReviewSubmission,
        StatusUpdateParams,
        StockAdjustmentParams,
        UpdateQuantityRequest,
    },
    errors::ServerError,
    identity::{Customer, SessionId},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro.
// The handler's type parameters must be declared in the same order as the bounds.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Cart  ----------------------------------------------------
route!(my_cart => Get "/cart" impl SessionStore, CatalogManagement);
/// The session's cart with its totals under the current shipping policy.
pub async fn my_cart<S: SessionStore, C: CatalogManagement>(
    session: SessionId,
    api: web::Data<CartApi<S, C>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET cart for session {}", session.as_str());
    let view = api.view(session.as_str()).await?;
    Ok(HttpResponse::Ok().json(view))
}

route!(add_to_cart => Post "/cart/items" impl SessionStore, CatalogManagement);
pub async fn add_to_cart<S: SessionStore, C: CatalogManagement>(
    session: SessionId,
    body: web::Json<AddToCartRequest>,
    api: web::Data<CartApi<S, C>>,
) -> Result<HttpResponse, ServerError> {
    let AddToCartRequest { product_id, quantity } = body.into_inner();
    debug!("💻️ Adding {quantity} x product {product_id} to cart for session {}", session.as_str());
    api.add_product(session.as_str(), product_id, quantity).await?;
    let view = api.view(session.as_str()).await?;
    Ok(HttpResponse::Ok().json(view))
}

route!(update_cart_item => Patch "/cart/items/{product_id}" impl SessionStore, CatalogManagement);
pub async fn update_cart_item<S: SessionStore, C: CatalogManagement>(
    session: SessionId,
    path: web::Path<i64>,
    body: web::Json<UpdateQuantityRequest>,
    api: web::Data<CartApi<S, C>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    debug!("💻️ Changing quantity of product {product_id} by {} for session {}", body.delta, session.as_str());
    api.update_quantity(session.as_str(), product_id, body.delta).await?;
    let view = api.view(session.as_str()).await?;
    Ok(HttpResponse::Ok().json(view))
}

route!(remove_cart_item => Delete "/cart/items/{product_id}" impl SessionStore, CatalogManagement);
pub async fn remove_cart_item<S: SessionStore, C: CatalogManagement>(
    session: SessionId,
    path: web::Path<i64>,
    api: web::Data<CartApi<S, C>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    debug!("💻️ Removing product {product_id} from cart for session {}", session.as_str());
    api.remove(session.as_str(), product_id).await?;
    let view = api.view(session.as_str()).await?;
    Ok(HttpResponse::Ok().json(view))
}

route!(clear_cart => Delete "/cart" impl SessionStore, CatalogManagement);
pub async fn clear_cart<S: SessionStore, C: CatalogManagement>(
    session: SessionId,
    api: web::Data<CartApi<S, C>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ Clearing cart for session {}", session.as_str());
    api.clear(session.as_str()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Cart cleared")))
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout => Post "/checkout" impl StorefrontDatabase, PaymentGateway, SessionStore);
/// Turns the session's cart into a paid order.
///
/// A declined or timed-out payment still leaves a `Pending` order behind, and the error message names it so that the
/// customer can use the `retry_payment` and `confirm_payment` routes.
pub async fn checkout<B: StorefrontDatabase, G: PaymentGateway, S: SessionStore>(
    customer: Customer,
    session: SessionId,
    body: web::Json<CheckoutParams>,
    carts: web::Data<CartApi<S, B>>,
    api: web::Data<CheckoutApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let CheckoutParams { customer_email, shipping } = body.into_inner();
    info!("💻️ Checkout requested by {} for session {}", customer.user_id, session.as_str());
    let request = CheckoutRequest::new(customer.user_id.clone(), customer_email, shipping);
    let order = api.checkout_session(carts.store(), session.as_str(), request).await.map_err(|e| {
        debug!("💻️ Checkout for {} failed. {e}", customer.user_id);
        e
    })?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(my_orders => Get "/orders" impl OrderManagement);
/// The caller's orders, newest first.
pub async fn my_orders<B: OrderManagement>(
    customer: Customer,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_orders for {}", customer.user_id);
    let orders = api.orders_for_user(&customer.user_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(my_order => Get "/orders/{order_number}" impl OrderManagement);
/// A single order with its items. Orders that belong to someone else are reported as missing.
pub async fn my_order<B: OrderManagement>(
    customer: Customer,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_number = OrderNumber::from(path.into_inner());
    debug!("💻️ GET order {order_number} for {}", customer.user_id);
    let order = owned_order(&customer, &order_number, api.as_ref()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(retry_payment => Post "/orders/{order_number}/retry_payment" impl StorefrontDatabase, PaymentGateway);
pub async fn retry_payment<B: StorefrontDatabase, G: PaymentGateway>(
    customer: Customer,
    path: web::Path<String>,
    body: web::Json<RetryPaymentParams>,
    orders: web::Data<OrderFlowApi<B>>,
    api: web::Data<CheckoutApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let order_number = OrderNumber::from(path.into_inner());
    info!("💻️ {} is retrying payment for order {order_number}", customer.user_id);
    owned_order(&customer, &order_number, orders.as_ref()).await?;
    let order = api.retry_payment(&order_number, &body.customer_email).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(confirm_payment => Post "/orders/{order_number}/confirm_payment" impl StorefrontDatabase, PaymentGateway);
/// Reconciles a payment whose outcome was lost, by transaction id or by order number. Calling it again for a paid
/// order is harmless.
pub async fn confirm_payment<B: StorefrontDatabase, G: PaymentGateway>(
    customer: Customer,
    path: web::Path<String>,
    body: web::Json<ConfirmPaymentParams>,
    orders: web::Data<OrderFlowApi<B>>,
    api: web::Data<CheckoutApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let order_number = OrderNumber::from(path.into_inner());
    owned_order(&customer, &order_number, orders.as_ref()).await?;
    let order = match body.into_inner().transaction_id {
        Some(txid) => {
            info!("💻️ {} is confirming transaction {txid} for order {order_number}", customer.user_id);
            api.confirm_payment(&order_number, &txid).await?
        },
        None => {
            info!("💻️ {} is asking for the payment of order {order_number} to be reconciled", customer.user_id);
            api.reconcile_payment(&order_number).await?
        },
    };
    Ok(HttpResponse::Ok().json(order))
}

async fn owned_order<B: OrderManagement>(
    customer: &Customer,
    order_number: &OrderNumber,
    api: &OrderFlowApi<B>,
) -> Result<OrderWithItems, ServerError> {
    let not_found = || ServerError::NoRecordFound(format!("Order {order_number} does not exist"));
    let order = api.order_with_items(order_number).await.map_err(|e| match ServerError::from(e) {
        ServerError::NoRecordFound(_) => not_found(),
        other => other,
    })?;
    if order.order.user_id != customer.user_id {
        warn!("💻️ {} asked for order {order_number}, which belongs to someone else", customer.user_id);
        return Err(not_found());
    }
    Ok(order)
}

//----------------------------------------------   Reviews  ----------------------------------------------------
route!(product_reviews => Get "/products/{id}/reviews" impl ReviewManagement);
pub async fn product_reviews<B: ReviewManagement>(
    path: web::Path<i64>,
    api: web::Data<ReviewApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    trace!("💻️ GET reviews for product {product_id}");
    let summary = api.approved_reviews(product_id).await?;
    Ok(HttpResponse::Ok().json(summary))
}

route!(review_eligibility => Get "/products/{id}/reviews/eligibility" impl ReviewManagement);
pub async fn review_eligibility<B: ReviewManagement>(
    customer: Customer,
    path: web::Path<i64>,
    api: web::Data<ReviewApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    let eligibility = api.eligibility(&customer.user_id, product_id).await?;
    debug!("💻️ {} review eligibility for product {product_id}: {eligibility:?}", customer.user_id);
    Ok(HttpResponse::Ok().json(EligibilityResponse::new(product_id, eligibility)))
}

route!(submit_review => Post "/products/{id}/reviews" impl ReviewManagement);
pub async fn submit_review<B: ReviewManagement>(
    customer: Customer,
    path: web::Path<i64>,
    body: web::Json<ReviewSubmission>,
    api: web::Data<ReviewApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    let ReviewSubmission { rating, title, comment } = body.into_inner();
    debug!("💻️ {} is reviewing product {product_id}", customer.user_id);
    let review = NewReview {
        product_id,
        user_id: customer.user_id,
        user_name: customer.user_name,
        rating,
        title,
        comment,
    };
    let review = api.submit_review(review).await?;
    Ok(HttpResponse::Created().json(review))
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(update_order_status => Patch "/orders/{order_number}/status" impl OrderManagement);
/// Moves an order along its lifecycle. Cancelling or returning an order that holds stock puts the stock back.
pub async fn update_order_status<B: OrderManagement>(
    path: web::Path<String>,
    body: web::Json<StatusUpdateParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_number = OrderNumber::from(path.into_inner());
    info!("💻️ Admin request to move order {order_number} to {}", body.status);
    let order = api.modify_status_for_order(&order_number, body.status).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(search_orders => Get "/orders" impl OrderManagement);
pub async fn search_orders<B: OrderManagement>(
    query: web::Query<OrderSearchParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let filter = query.into_inner().into_filter().map_err(ServerError::InvalidRequestPath)?;
    debug!("💻️ GET orders search for [{filter}]");
    let orders = api.search_orders(filter).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(adjust_stock => Post "/products/{id}/stock" impl InventoryManagement);
pub async fn adjust_stock<B: InventoryManagement>(
    admin: Option<Customer>,
    path: web::Path<i64>,
    body: web::Json<StockAdjustmentParams>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    let StockAdjustmentParams { delta, action, notes } = body.into_inner();
    info!("💻️ Admin stock adjustment of {delta} ({action}) for product {product_id}");
    let log = api.adjust_stock(product_id, delta, action, notes, admin.map(|a| a.user_id)).await?;
    Ok(HttpResponse::Ok().json(log))
}

route!(stock_history => Get "/products/{id}/stock" impl InventoryManagement);
pub async fn stock_history<B: InventoryManagement>(
    path: web::Path<i64>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    trace!("💻️ GET stock history for product {product_id}");
    let history = api.stock_history(product_id).await?;
    Ok(HttpResponse::Ok().json(history))
}

route!(moderate_review => Patch "/reviews/{id}" impl ReviewManagement);
pub async fn moderate_review<B: ReviewManagement>(
    path: web::Path<i64>,
    body: web::Json<ModerationParams>,
    api: web::Data<ReviewApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let review_id = path.into_inner();
    info!("💻️ Admin moderation of review #{review_id}: approved = {}", body.approved);
    let review = api.moderate_review(review_id, body.approved).await?;
    Ok(HttpResponse::Ok().json(review))
}
