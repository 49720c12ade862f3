//! Checkout input and the checks it must pass before an [`Order`] exists.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::order::{LineItem, Order, PaymentMethod, ShippingAddress};

/// Raw checkout payload. Every field may be missing, and ids and enums stay
/// as text, so that all problems can be reported together instead of failing
/// on the first one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OrderDraft {
    pub buyer_id: Option<String>,
    pub items: Vec<LineItemDraft>,
    pub shipping_address: ShippingAddress,
    pub payment_method: Option<String>,
    pub total_cents: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LineItemDraft {
    pub product_id: String,
    pub name: String,
    pub price_cents: Option<i64>,
    pub quantity: i64,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("order rejected with {} invalid field(s)", .0.len())]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

#[derive(Default)]
struct Collector(Vec<FieldError>);

impl Collector {
    fn push(&mut self, field: impl Into<String>, message: &str) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.to_string(),
        });
    }

    fn required(&mut self, field: &str, value: &str) -> String {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.push(field, "is required");
        }
        trimmed.to_string()
    }
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

impl LineItemDraft {
    fn validate(self, index: usize, errors: &mut Collector) -> Option<LineItem> {
        let field = |name: &str| format!("items[{index}].{name}");

        let product_id = match Uuid::parse_str(self.product_id.trim()) {
            Ok(id) => Some(id),
            Err(_) => {
                errors.push(field("product_id"), "is not a valid product id");
                None
            }
        };
        let name = errors.required(&field("name"), &self.name);
        let price_cents = match self.price_cents {
            Some(p) if p > 0 => Some(p),
            Some(_) => {
                errors.push(field("price_cents"), "must be positive");
                None
            }
            None => {
                errors.push(field("price_cents"), "is required");
                None
            }
        };
        let quantity = match u32::try_from(self.quantity) {
            Ok(q) if q >= 1 => Some(q),
            _ => {
                errors.push(field("quantity"), "must be at least 1");
                None
            }
        };

        match (product_id, price_cents, quantity) {
            (Some(product_id), Some(price_cents), Some(quantity)) if !name.is_empty() => {
                Some(LineItem {
                    product_id,
                    name,
                    price_cents,
                    quantity,
                    image: self.image.filter(|i| !i.trim().is_empty()),
                })
            }
            _ => None,
        }
    }
}

impl ShippingAddress {
    fn normalized(&self, errors: &mut Collector) -> ShippingAddress {
        let address = ShippingAddress {
            person_name: errors.required("shipping_address.person_name", &self.person_name),
            mobile_number: errors.required("shipping_address.mobile_number", &self.mobile_number),
            street_address: errors
                .required("shipping_address.street_address", &self.street_address),
            postal_code: errors.required("shipping_address.postal_code", &self.postal_code),
            state: errors.required("shipping_address.state", &self.state),
        };
        if !address.mobile_number.is_empty() && !is_digits(&address.mobile_number, 10) {
            errors.push(
                "shipping_address.mobile_number",
                "must be exactly 10 digits",
            );
        }
        if !address.postal_code.is_empty() && !is_digits(&address.postal_code, 6) {
            errors.push("shipping_address.postal_code", "must be exactly 6 digits");
        }
        address
    }
}

impl Order {
    /// Validates a checkout payload and opens a Pending order at Stage1.
    /// The total is taken as given; it is never recomputed from the items.
    pub fn place(draft: OrderDraft) -> Result<Self, ValidationErrors> {
        let mut errors = Collector::default();

        let buyer_id = match draft.buyer_id.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push("buyer_id", "is required");
                None
            }
            Some(raw) => match Uuid::parse_str(raw) {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.push("buyer_id", "is not a valid buyer id");
                    None
                }
            },
        };
        if draft.items.is_empty() {
            errors.push("items", "must contain at least one item");
        }
        let items: Vec<LineItem> = draft
            .items
            .into_iter()
            .enumerate()
            .filter_map(|(i, item)| item.validate(i, &mut errors))
            .collect();
        let shipping_address = draft.shipping_address.normalized(&mut errors);
        let payment_method = match draft.payment_method.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push("payment_method", "is required");
                None
            }
            Some(raw) => match raw.parse::<PaymentMethod>() {
                Ok(method) => Some(method),
                Err(_) => {
                    errors.push(
                        "payment_method",
                        "must be CashOnDelivery or DigitalWallet",
                    );
                    None
                }
            },
        };
        let total_cents = match draft.total_cents {
            Some(t) if t > 0 => Some(t),
            Some(_) => {
                errors.push("total_cents", "must be positive");
                None
            }
            None => {
                errors.push("total_cents", "is required");
                None
            }
        };

        match (buyer_id, payment_method, total_cents) {
            (Some(buyer_id), Some(payment_method), Some(total_cents)) if errors.0.is_empty() => {
                Ok(Order::pending(
                    buyer_id,
                    items,
                    shipping_address,
                    payment_method,
                    total_cents,
                ))
            }
            _ => Err(ValidationErrors(errors.0)),
        }
    }
}
