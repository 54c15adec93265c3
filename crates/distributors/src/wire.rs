//! JSON shapes of the distributor HTTP contract. Field names are camelCase on
//! the wire; money goes out as JSON numbers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const QUOTATION_REQUEST_PATH: &str = "api/quotation/request";
pub const QUOTATION_STATUS_PATH: &str = "api/quotation/update-status";
pub const PRODUCT_PATH: &str = "api/product";
pub const ORDER_PATH: &str = "api/order";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationRequestBody<'a> {
    pub product_id: i64,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationReply {
    pub id: i64,
    pub product_id: i64,
    #[serde(default)]
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub available_stock: u32,
    pub estimated_delivery_days: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateBody<'a> {
    pub quotation_id: i64,
    pub status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogItem {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: u32,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBody<'a> {
    pub order_number: &'a str,
    pub customer_name: &'a str,
    pub customer_email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<&'a str>,
    pub shipping_address: &'a str,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub total_amount: Decimal,
    pub order_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<&'a str>,
    pub order_items: Vec<OrderItemBody>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemBody {
    pub product_id: i64,
    pub quantity: u32,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub unit_price: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub total_price: Decimal,
}

/// Distributors disagree on whether the order id is a number or a string, and
/// older builds call it `id`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReply {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, alias = "id")]
    pub order_id: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub estimated_delivery_days: Option<u32>,
    #[serde(default)]
    pub estimated_delivery_date: Option<String>,
}

impl OrderReply {
    pub fn order_id(&self) -> Option<String> {
        match self.order_id.as_ref()? {
            Value::String(id) if !id.trim().is_empty() => Some(id.trim().to_string()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}
