use crate::error::{OrderError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed set of accepted payment methods.
///
/// Anything outside this set is a validation failure before the store is
/// touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Wechat,
    Alipay,
    Bank,
    Cod,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wechat => "wechat",
            Self::Alipay => "alipay",
            Self::Bank => "bank",
            Self::Cod => "cod",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "wechat" => Ok(Self::Wechat),
            "alipay" => Ok(Self::Alipay),
            "bank" => Ok(Self::Bank),
            "cod" => Ok(Self::Cod),
            other => Err(OrderError::Validation(format!(
                "unsupported payment method: {other}"
            ))),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order lifecycle state.
///
/// The commit protocol only ever creates orders as `Pending`. Later
/// transitions are administrative; `Cancelled` additionally suppresses stock
/// restoration when the order is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Fulfilled,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fulfilled => "fulfilled",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "fulfilled" => Ok(Self::Fulfilled),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(OrderError::Validation(format!(
                "unknown order status: {other}"
            ))),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One requested line of a purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: i64,
    pub quantity: i64,
}

/// An inbound order submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub customer_name: String,
    pub phone: String,
    pub address: String,
    #[serde(default)]
    pub remark: String,
    pub payment_method: PaymentMethod,
    pub lines: Vec<OrderLine>,
}

impl OrderRequest {
    /// Cheap, side-effect-free request validation, performed before the
    /// request enters the serialized unit of work.
    pub fn validate(&self) -> Result<()> {
        if self.customer_name.trim().is_empty() {
            return Err(OrderError::Validation("customer name is required".into()));
        }
        if self.phone.trim().is_empty() {
            return Err(OrderError::Validation("phone is required".into()));
        }
        if self.address.trim().is_empty() {
            return Err(OrderError::Validation("address is required".into()));
        }
        if self.lines.is_empty() {
            return Err(OrderError::Validation(
                "order must contain at least one line".into(),
            ));
        }
        for line in &self.lines {
            if line.quantity <= 0 {
                return Err(OrderError::Validation(format!(
                    "quantity for product {} must be positive",
                    line.product_id
                )));
            }
        }
        Ok(())
    }
}

/// Identity and total of a freshly committed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_id: i64,
    pub total: Decimal,
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub customer_name: String,
    pub phone: String,
    pub address: String,
    pub total: Decimal,
    pub status: OrderStatus,
    pub remark: String,
    pub payment_method: PaymentMethod,
    pub created_at: String,
}

/// A persisted order line with the unit price locked at commit time.
///
/// `product_name` comes from a left join against the catalog and is absent if
/// the product row has since been removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub product_name: Option<String>,
}

/// An order together with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}
