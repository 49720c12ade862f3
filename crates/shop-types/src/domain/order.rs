use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    DeliveredConfirmed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::DeliveredConfirmed,
    ];

    /// Absorbing states: nothing may change an order once it gets here.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::DeliveredConfirmed)
    }

    /// Statuses the buyer may still cancel from, delivery window permitting.
    pub fn allows_cancellation(self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Processing
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::DeliveredConfirmed => "DeliveredConfirmed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("order status", s))
    }
}

/// Delivery progress, ordered from furthest out to arriving today.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeliveryOption {
    Stage1,
    Stage2,
    Stage3,
    Stage4,
    Stage5,
}

impl DeliveryOption {
    pub const ALL: [DeliveryOption; 5] = [
        DeliveryOption::Stage1,
        DeliveryOption::Stage2,
        DeliveryOption::Stage3,
        DeliveryOption::Stage4,
        DeliveryOption::Stage5,
    ];

    pub fn days_out(self) -> u8 {
        match self {
            DeliveryOption::Stage1 => 5,
            DeliveryOption::Stage2 => 3,
            DeliveryOption::Stage3 => 2,
            DeliveryOption::Stage4 => 1,
            DeliveryOption::Stage5 => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DeliveryOption::Stage1 => "5 days",
            DeliveryOption::Stage2 => "3 days",
            DeliveryOption::Stage3 => "2 days",
            DeliveryOption::Stage4 => "1 day",
            DeliveryOption::Stage5 => "arriving today",
        }
    }

    /// Buyers may cancel only while delivery is at least three days out.
    pub fn within_cancellation_window(self) -> bool {
        self <= DeliveryOption::Stage2
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryOption::Stage1 => "Stage1",
            DeliveryOption::Stage2 => "Stage2",
            DeliveryOption::Stage3 => "Stage3",
            DeliveryOption::Stage4 => "Stage4",
            DeliveryOption::Stage5 => "Stage5",
        }
    }
}

impl fmt::Display for DeliveryOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryOption {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeliveryOption::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("delivery option", s))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    CashOnDelivery,
    DigitalWallet,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "CashOnDelivery",
            PaymentMethod::DigitalWallet => "DigitalWallet",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CashOnDelivery" => Ok(PaymentMethod::CashOnDelivery),
            "DigitalWallet" => Ok(PaymentMethod::DigitalWallet),
            other => Err(ParseEnumError::new("payment method", other)),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} `{value}`")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Snapshot of a product as it was when the order was placed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineItem {
    pub product_id: Uuid,
    pub name: String,
    pub price_cents: i64,
    pub quantity: u32,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShippingAddress {
    pub person_name: String,
    pub mobile_number: String,
    pub street_address: String,
    pub postal_code: String,
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub items: Vec<LineItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub delivery_option: DeliveryOption,
    pub admin_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Bumped on every accepted transition; stores compare it before writing.
    pub version: i64,
}

/// Fields an operator may overwrite. Absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminUpdate {
    pub status: Option<OrderStatus>,
    pub delivery_option: Option<DeliveryOption>,
    pub admin_message: Option<String>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("order is {0}; this change is no longer allowed")]
    TerminalState(OrderStatus),

    #[error("cancellation window closed: delivery is {}", .0.label())]
    CancellationWindowClosed(DeliveryOption),
}

impl Order {
    pub(crate) fn pending(
        buyer_id: Uuid,
        items: Vec<LineItem>,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
        total_cents: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            buyer_id,
            items,
            shipping_address,
            payment_method,
            total_cents,
            status: OrderStatus::Pending,
            delivery_option: DeliveryOption::Stage1,
            admin_message: None,
            created_at: now,
            updated_at: now,
            delivered_at: None,
            cancelled_at: None,
            version: 1,
        }
    }

    pub fn apply_admin_update(&mut self, update: AdminUpdate) -> Result<(), TransitionError> {
        self.ensure_open()?;
        let now = Utc::now();
        if let Some(status) = update.status {
            self.status = status;
            match status {
                OrderStatus::Cancelled => self.cancelled_at = Some(now),
                OrderStatus::DeliveredConfirmed => self.delivered_at = Some(now),
                _ => {}
            }
        }
        if let Some(option) = update.delivery_option {
            self.delivery_option = option;
        }
        if let Some(message) = update.admin_message {
            self.admin_message = Some(message);
        }
        self.touch(now);
        Ok(())
    }

    pub fn confirm_received(&mut self) -> Result<(), TransitionError> {
        self.ensure_open()?;
        let now = Utc::now();
        self.status = OrderStatus::DeliveredConfirmed;
        self.delivered_at = Some(now);
        self.touch(now);
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        if !self.status.allows_cancellation() {
            return Err(TransitionError::TerminalState(self.status));
        }
        if !self.delivery_option.within_cancellation_window() {
            return Err(TransitionError::CancellationWindowClosed(
                self.delivery_option,
            ));
        }
        let now = Utc::now();
        self.status = OrderStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.touch(now);
        Ok(())
    }

    pub fn contains_product(&self, product_id: Uuid) -> bool {
        self.items.iter().any(|it| it.product_id == product_id)
    }

    /// `delivered_at` tracks DeliveredConfirmed and `cancelled_at` tracks Cancelled.
    pub fn timestamps_consistent(&self) -> bool {
        self.delivered_at.is_some() == (self.status == OrderStatus::DeliveredConfirmed)
            && self.cancelled_at.is_some() == (self.status == OrderStatus::Cancelled)
    }

    fn ensure_open(&self) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::TerminalState(self.status));
        }
        Ok(())
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.version += 1;
    }
}
