use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::distributor::DistributorId;
use crate::domain::order::OrderId;
use crate::domain::product::ProductId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

impl QuoteId {
    pub fn generate() -> Self {
        Self(format!("QT-{}", Uuid::new_v4().simple()))
    }
}

impl fmt::Display for QuoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Pending,
    Selected,
    Confirmed,
    Cancelled,
    Failed,
    Error,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Selected => "selected",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" | "received" => Some(Self::Pending),
            "selected" => Some(Self::Selected),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            "failed" => Some(Self::Failed),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Label used on the distributor wire contract.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Selected => "Selected",
            Self::Confirmed => "Confirmed",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
            Self::Error => "Error",
        }
    }

    /// Statuses held by the quote that won its product.
    pub fn is_winning(&self) -> bool {
        matches!(self, Self::Selected | Self::Confirmed | Self::Failed | Self::Error)
    }

    /// Statuses whose price counts toward the order total.
    pub fn is_priced(&self) -> bool {
        matches!(self, Self::Selected | Self::Confirmed)
    }

    /// Winners that still need a successful placement.
    pub fn awaits_placement(&self) -> bool {
        matches!(self, Self::Selected | Self::Failed | Self::Error)
    }
}

/// A solicitation reply as it arrived from a distributor, tagged with the
/// distributor that sent it. Prices are distributor-side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedQuote {
    pub distributor_id: DistributorId,
    pub distributor_quotation_id: Option<i64>,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub available_stock: u32,
    pub estimated_delivery_days: u32,
    pub notes: Option<String>,
    pub received_at: DateTime<Utc>,
}

/// A stored quote. `unit_price` and `total_price` are markup-inclusive;
/// `quoted_unit_price` keeps the distributor's figure for scoring and audit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub distributor_id: DistributorId,
    pub distributor_quotation_id: Option<i64>,
    pub quantity: u32,
    pub quoted_unit_price: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub available_stock: u32,
    pub estimated_delivery_days: u32,
    pub status: QuoteStatus,
    pub distributor_order_id: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub delivery_estimate: Option<NaiveDate>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quote {
    pub fn can_transition_to(&self, next: QuoteStatus) -> bool {
        use QuoteStatus::{Cancelled, Confirmed, Error, Failed, Pending, Selected};

        if self.status == next {
            return true;
        }

        matches!(
            (self.status, next),
            (Pending, Selected)
                | (Pending, Cancelled)
                | (Selected, Confirmed)
                | (Selected, Failed)
                | (Selected, Error)
                | (Selected, Cancelled)
                | (Failed | Error, Confirmed)
                | (Failed | Error, Failed | Error)
                | (Failed | Error, Selected)
                | (Failed | Error, Cancelled)
                | (Cancelled, Selected)
                | (Selected | Cancelled | Failed | Error, Pending)
        )
    }

    pub fn transition_to(&mut self, next: QuoteStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            self.updated_at = Utc::now();
            return Ok(());
        }

        Err(DomainError::InvalidQuoteTransition { from: self.status, to: next })
    }

    /// Appends a timestamped line to the human-readable audit trail.
    pub fn append_note(&mut self, note: impl AsRef<str>) {
        let note = note.as_ref().trim();
        if note.is_empty() {
            return;
        }
        let line = format!("[{}] {note}", Utc::now().format("%Y-%m-%dT%H:%M:%SZ"));
        if self.notes.is_empty() {
            self.notes = line;
        } else {
            self.notes.push('\n');
            self.notes.push_str(&line);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::distributor::DistributorId;
    use crate::domain::order::OrderId;
    use crate::domain::product::ProductId;
    use crate::errors::DomainError;

    use super::{Quote, QuoteId, QuoteStatus};

    fn quote(status: QuoteStatus) -> Quote {
        Quote {
            id: QuoteId("QT-1".to_string()),
            order_id: OrderId("ORD-1".to_string()),
            product_id: ProductId(1),
            product_name: "Mechanical Keyboard".to_string(),
            distributor_id: DistributorId::new("north"),
            distributor_quotation_id: Some(41),
            quantity: 2,
            quoted_unit_price: Decimal::new(5_000, 2),
            unit_price: Decimal::new(6_000, 2),
            total_price: Decimal::new(12_000, 2),
            available_stock: 10,
            estimated_delivery_days: 3,
            status,
            distributor_order_id: None,
            confirmed_at: None,
            delivery_estimate: None,
            notes: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn allows_selection_then_confirmation() {
        let mut quote = quote(QuoteStatus::Pending);
        quote.transition_to(QuoteStatus::Selected).expect("pending -> selected");
        quote.transition_to(QuoteStatus::Confirmed).expect("selected -> confirmed");
        assert_eq!(quote.status, QuoteStatus::Confirmed);
    }

    #[test]
    fn confirmed_quotes_are_final() {
        let mut quote = quote(QuoteStatus::Confirmed);
        let error = quote.transition_to(QuoteStatus::Cancelled).expect_err("confirmed is final");
        assert_eq!(
            error,
            DomainError::InvalidQuoteTransition {
                from: QuoteStatus::Confirmed,
                to: QuoteStatus::Cancelled
            }
        );
        quote.transition_to(QuoteStatus::Confirmed).expect("same status is a no-op");
    }

    #[test]
    fn pending_quotes_cannot_confirm_without_selection() {
        let mut quote = quote(QuoteStatus::Pending);
        assert!(quote.transition_to(QuoteStatus::Confirmed).is_err());
    }

    #[test]
    fn failed_placements_can_be_retried_or_reassigned() {
        let mut retried = quote(QuoteStatus::Failed);
        retried.transition_to(QuoteStatus::Confirmed).expect("failed -> confirmed on retry");

        let mut reassigned = quote(QuoteStatus::Error);
        reassigned.transition_to(QuoteStatus::Cancelled).expect("error -> cancelled");
        reassigned.transition_to(QuoteStatus::Selected).expect("cancelled -> selected");
    }

    #[test]
    fn status_labels_round_trip() {
        for status in [
            QuoteStatus::Pending,
            QuoteStatus::Selected,
            QuoteStatus::Confirmed,
            QuoteStatus::Cancelled,
            QuoteStatus::Failed,
            QuoteStatus::Error,
        ] {
            assert_eq!(QuoteStatus::parse(status.as_str()), Some(status));
            assert_eq!(QuoteStatus::parse(status.label()), Some(status));
        }
        assert_eq!(QuoteStatus::parse("Received"), Some(QuoteStatus::Pending));
        assert_eq!(QuoteStatus::parse("shipped"), None);
    }

    #[test]
    fn notes_accumulate_as_separate_lines() {
        let mut quote = quote(QuoteStatus::Pending);
        quote.append_note("received from north");
        quote.append_note("  ");
        quote.append_note("selected as best offer");

        let lines: Vec<&str> = quote.notes.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("received from north"));
        assert!(lines[1].ends_with("selected as best offer"));
    }
}
