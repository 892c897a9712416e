use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
pub use sf_common::Money;
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(String);

//--------------------------------------      OrderNumber      ---------------------------------------------------------
/// The human-readable, globally unique reference for an order, e.g. `ORD-20240229133000-4821`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(pub String);

impl FromStr for OrderNumber {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConversionError("An order number cannot be empty".into()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// The order lifecycle.
///
/// ```text
///  Pending ──► Paid ──► Processing ──► Shipped ──► Delivered
///     │         │           │             │
///     └─────────┴───────────┴─────────────┴──► Cancelled | Returned
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been created but no payment has been captured.
    Pending,
    /// Payment was captured and stock was deducted.
    Paid,
    /// The merchant is preparing the order.
    Processing,
    /// The order has left the warehouse.
    Shipped,
    /// The customer has received the order.
    Delivered,
    /// The order was cancelled by the customer or an admin.
    Cancelled,
    /// The goods were sent back by the customer.
    Returned,
}

impl OrderStatusType {
    pub const ALL: [OrderStatusType; 7] = [
        Self::Pending,
        Self::Paid,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
        Self::Returned,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Returned)
    }

    /// True for the states in which the order's items have been taken out of stock and not yet put back.
    pub fn holds_stock(&self) -> bool {
        matches!(self, Self::Paid | Self::Processing | Self::Shipped | Self::Delivered)
    }

    /// The next status along the fulfilment path, if there is one.
    pub fn next_fulfilment_step(&self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Paid),
            Self::Paid => Some(Self::Processing),
            Self::Processing => Some(Self::Shipped),
            Self::Shipped => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled | Self::Returned => None,
        }
    }

    /// Whether the state machine permits moving from `self` to `new_status`.
    pub fn can_transition_to(&self, new_status: OrderStatusType) -> bool {
        if self.is_terminal() {
            return false;
        }
        match new_status {
            Self::Cancelled | Self::Returned => true,
            s => self.next_fulfilment_step() == Some(s),
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Paid => write!(f, "Paid"),
            OrderStatusType::Processing => write!(f, "Processing"),
            OrderStatusType::Shipped => write!(f, "Shipped"),
            OrderStatusType::Delivered => write!(f, "Delivered"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
            OrderStatusType::Returned => write!(f, "Returned"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Processing" => Ok(Self::Processing),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            "Returned" => Ok(Self::Returned),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------      StockAction      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum StockAction {
    /// New stock arrived from a supplier.
    Received,
    /// Units left the shelf through a paid order.
    Sold,
    /// Units came back from a customer.
    Returned,
    /// A manual correction, e.g. after a stock count or an order cancellation.
    Adjusted,
    /// Units were written off.
    Damaged,
}

impl Display for StockAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockAction::Received => write!(f, "Received"),
            StockAction::Sold => write!(f, "Sold"),
            StockAction::Returned => write!(f, "Returned"),
            StockAction::Adjusted => write!(f, "Adjusted"),
            StockAction::Damaged => write!(f, "Damaged"),
        }
    }
}

impl FromStr for StockAction {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Received" => Ok(Self::Received),
            "Sold" => Ok(Self::Sold),
            "Returned" => Ok(Self::Returned),
            "Adjusted" => Ok(Self::Adjusted),
            "Damaged" => Ok(Self::Damaged),
            s => Err(ConversionError(format!("Invalid stock action: {s}"))),
        }
    }
}

//--------------------------------------        Product        ---------------------------------------------------------
/// A catalog product, as far as checkout is concerned. The catalog owns everything else about a product.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub price: Money,
    pub discount_price: Option<Money>,
    pub stock_quantity: i64,
    pub main_image: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// The price a customer pays today: the discounted price when there is one.
    pub fn effective_price(&self) -> Money {
        self.discount_price.unwrap_or(self.price)
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub price: Money,
    pub discount_price: Option<Money>,
    pub stock_quantity: i64,
    pub main_image: Option<String>,
    pub is_active: bool,
}

impl NewProduct {
    pub fn new<S: Into<String>>(name: S, sku: S, price: Money, stock_quantity: i64) -> Self {
        let name = name.into();
        let slug = slugify(&name);
        Self {
            name,
            slug,
            sku: sku.into(),
            price,
            discount_price: None,
            stock_quantity,
            main_image: None,
            is_active: true,
        }
    }

    pub fn with_discount_price(mut self, price: Money) -> Self {
        self.discount_price = Some(price);
        self
    }

    pub fn with_image<S: Into<String>>(mut self, url: S) -> Self {
        self.main_image = Some(url.into());
        self
    }

    pub fn with_slug<S: Into<String>>(mut self, slug: S) -> Self {
        self.slug = slug.into();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric()).filter(|s| !s.is_empty()).collect::<Vec<_>>().join("-").to_lowercase()
}

//--------------------------------------      ShippingInfo     ---------------------------------------------------------
/// Where the order goes. Address, city, postal code and phone are mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub phone: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ShippingInfo {
    pub fn new<S: Into<String>>(address: S, city: S, postal_code: S, phone: S) -> Self {
        Self {
            address: address.into(),
            city: city.into(),
            postal_code: postal_code.into(),
            phone: phone.into(),
            notes: None,
        }
    }

    pub fn with_notes<S: Into<String>>(mut self, notes: S) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Returns the names of the mandatory fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("address", &self.address),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("phone", &self.phone),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect()
    }

    /// A copy with surrounding whitespace removed, and blank notes dropped.
    pub fn normalized(&self) -> Self {
        Self {
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            phone: self.phone.trim().to_string(),
            notes: self.notes.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from),
        }
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    pub user_id: String,
    pub status: OrderStatusType,
    pub sub_total: Money,
    pub shipping_cost: Money,
    pub discount: Money,
    pub tax: Money,
    pub total_amount: Money,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_postal_code: String,
    pub shipping_phone: String,
    pub notes: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
/// A fully priced order that has not been written to the database yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub user_id: String,
    pub sub_total: Money,
    pub shipping_cost: Money,
    pub discount: Money,
    pub tax: Money,
    pub total_amount: Money,
    pub shipping: ShippingInfo,
    pub payment_method: Option<String>,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    /// True when the stored total agrees with its components.
    pub fn totals_are_consistent(&self) -> bool {
        let items_total: Money = self.items.iter().map(NewOrderItem::total_price).sum();
        items_total == self.sub_total
            && self.total_amount == self.sub_total + self.shipping_cost + self.tax - self.discount
    }

    /// The quantity of each product in the order, merged over duplicate lines and sorted by product id.
    ///
    /// Stock is always touched in product-id order, so two orders that share products lock them in the same sequence.
    pub fn quantities_by_product(&self) -> Vec<(i64, i64)> {
        let mut quantities = std::collections::BTreeMap::<i64, i64>::new();
        for item in &self.items {
            *quantities.entry(item.product_id).or_default() += item.quantity;
        }
        quantities.into_iter().collect()
    }
}

//--------------------------------------       OrderItem       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub total_price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: i64,
}

impl NewOrderItem {
    pub fn total_price(&self) -> Money {
        self.unit_price * self.quantity
    }
}

//--------------------------------------        StockLog       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct StockLog {
    pub id: i64,
    pub product_id: i64,
    pub action: StockAction,
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub notes: Option<String>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An audit entry for one stock change. The signed `quantity` is always derived from the two stock levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStockLog {
    pub product_id: i64,
    pub action: StockAction,
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub notes: Option<String>,
    pub user_id: Option<String>,
}

impl NewStockLog {
    pub fn for_change(product_id: i64, action: StockAction, previous_stock: i64, new_stock: i64) -> Self {
        Self {
            product_id,
            action,
            quantity: new_stock - previous_stock,
            previous_stock,
            new_stock,
            notes: None,
            user_id: None,
        }
    }

    pub fn with_notes<S: Into<String>>(mut self, notes: S) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_user(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }
}

//--------------------------------------     ProductReview     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ProductReview {
    pub id: i64,
    pub product_id: i64,
    pub user_id: String,
    pub user_name: String,
    pub rating: i64,
    pub title: Option<String>,
    pub comment: String,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReview {
    pub product_id: i64,
    pub user_id: String,
    pub user_name: String,
    pub rating: i64,
    #[serde(default)]
    pub title: Option<String>,
    pub comment: String,
}

//--------------------------------------      SiteSetting      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SiteSetting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}
