use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Collection, Entity, LineItem};

/// Lifecycle of a service order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Device received, awaiting diagnosis.
    #[default]
    #[serde(rename = "Aguardando Análise")]
    Entry,
    /// Quote being prepared or sent.
    #[serde(rename = "Em Orçamento")]
    Budget,
    /// Customer approved the quote.
    #[serde(rename = "Aprovado")]
    Approved,
    /// Repair in progress.
    #[serde(rename = "Em Reparo")]
    InRepair,
    /// Repair done, awaiting pickup.
    #[serde(rename = "Finalizado")]
    Finished,
    /// Handed back to the customer.
    #[serde(rename = "Entregue")]
    Delivered,
    /// Abandoned.
    #[serde(rename = "Cancelado")]
    Cancelled,
    /// Returned under warranty.
    #[serde(rename = "Garantia/Retorno")]
    Warranty,
}

impl OrderStatus {
    /// All statuses in workflow order.
    pub const ALL: [OrderStatus; 8] = [
        Self::Entry,
        Self::Budget,
        Self::Approved,
        Self::InRepair,
        Self::Finished,
        Self::Delivered,
        Self::Cancelled,
        Self::Warranty,
    ];

    /// Label stored in documents and shown to customers.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Entry => "Aguardando Análise",
            Self::Budget => "Em Orçamento",
            Self::Approved => "Aprovado",
            Self::InRepair => "Em Reparo",
            Self::Finished => "Finalizado",
            Self::Delivered => "Entregue",
            Self::Cancelled => "Cancelado",
            Self::Warranty => "Garantia/Retorno",
        }
    }

    /// Parse a stored label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == label)
    }

    /// Finished or delivered: the order counts as revenue.
    #[must_use]
    pub fn is_completed(self) -> bool {
        matches!(self, Self::Finished | Self::Delivered)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether an order has been paid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Nothing paid yet.
    #[default]
    #[serde(rename = "Pendente")]
    Pending,
    /// Partly paid.
    #[serde(rename = "Parcial")]
    Partial,
    /// Settled.
    #[serde(rename = "Pago")]
    Paid,
}

impl PaymentStatus {
    /// Stored label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pendente",
            Self::Partial => "Parcial",
            Self::Paid => "Pago",
        }
    }

    /// Parse a stored label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        [Self::Pending, Self::Partial, Self::Paid]
            .into_iter()
            .find(|s| s.label() == label)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Order priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    /// Baixa
    #[serde(rename = "Baixa")]
    Low,
    /// Média
    #[serde(rename = "Média")]
    Medium,
    /// Alta
    #[serde(rename = "Alta")]
    High,
    /// Urgente
    #[serde(rename = "Urgente")]
    Urgent,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "Baixa",
            Self::Medium => "Média",
            Self::High => "Alta",
            Self::Urgent => "Urgente",
        })
    }
}

/// One step in an order's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Status after the change.
    pub status: OrderStatus,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
    /// Free-text note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Kind of an occurrence log entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OccurrenceKind {
    /// Informação
    #[default]
    #[serde(rename = "Informação")]
    Info,
    /// Alerta
    #[serde(rename = "Alerta")]
    Alert,
    /// Problema
    #[serde(rename = "Problema")]
    Problem,
}

impl fmt::Display for OccurrenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "Informação",
            Self::Alert => "Alerta",
            Self::Problem => "Problema",
        })
    }
}

/// A timestamped note attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    /// Entry id.
    pub id: String,
    /// What happened.
    pub description: String,
    /// When it was logged.
    pub timestamp: DateTime<Utc>,
    /// Severity of the entry.
    #[serde(rename = "type", default)]
    pub kind: OccurrenceKind,
}

/// A repair ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceOrder {
    /// Record id; empty until first saved.
    pub id: String,
    /// Human-facing sequential number.
    pub order_number: u32,
    /// Owning customer.
    pub customer_id: String,
    /// Device under repair.
    pub equipment_id: String,
    /// Workflow status.
    pub status: OrderStatus,
    /// Payment state.
    pub payment_status: PaymentStatus,
    /// How it was paid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    /// Defect reported by the customer.
    pub problem_description: String,
    /// Technician's findings.
    pub technical_report: String,
    /// Items left with the device.
    pub accessories: String,
    /// Inspection item name to pass/fail.
    pub checklist: BTreeMap<String, bool>,
    /// Notes on the inspection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checklist_observations: Option<String>,
    /// Inline `data:` URLs.
    pub photos: Vec<String>,
    /// Parts and services used.
    pub items: Vec<LineItem>,
    /// Labour charged.
    pub labor_cost: Decimal,
    /// Internal labour cost.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labor_cost_base: Option<Decimal>,
    /// Diagnosis fee charged.
    pub diagnosis_fee: Decimal,
    /// Items plus labour plus diagnosis.
    pub total: Decimal,
    /// Item cost plus internal labour cost.
    pub total_cost: Decimal,
    /// Warranty length in days.
    pub warranty_days: u32,
    /// Set when the order is delivered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warranty_expiry_date: Option<NaiveDate>,
    /// When the order was opened.
    pub created_at: DateTime<Utc>,
    /// Last save.
    pub updated_at: DateTime<Utc>,
    /// Assigned technician.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technician: Option<String>,
    /// Urgency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// One entry per save, oldest first.
    pub history: Vec<HistoryEntry>,
    /// Free-form log.
    pub occurrences: Vec<Occurrence>,
}

impl Default for ServiceOrder {
    fn default() -> Self {
        Self {
            id: String::new(),
            order_number: 0,
            customer_id: String::new(),
            equipment_id: String::new(),
            status: OrderStatus::default(),
            payment_status: PaymentStatus::default(),
            payment_method: None,
            problem_description: String::new(),
            technical_report: String::new(),
            accessories: String::new(),
            checklist: BTreeMap::new(),
            checklist_observations: None,
            photos: Vec::new(),
            items: Vec::new(),
            labor_cost: Decimal::ZERO,
            labor_cost_base: None,
            diagnosis_fee: Decimal::ZERO,
            total: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            warranty_days: 90,
            warranty_expiry_date: None,
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
            technician: None,
            priority: None,
            history: Vec::new(),
            occurrences: Vec::new(),
        }
    }
}

impl ServiceOrder {
    /// Whether the order has never been saved.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.id.is_empty()
    }
}

impl Entity for ServiceOrder {
    const COLLECTION: Collection = Collection::Orders;
    const KIND: &'static str = "order";

    fn id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> String {
        format!("{:010}", self.order_number)
    }

    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::Owned(self.order_number.to_string())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels_round_trip() {
        for status in OrderStatus::ALL {
            assert_eq!(OrderStatus::from_label(status.label()), Some(status));
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, status.label());
        }
        assert_eq!(OrderStatus::from_label("nope"), None);
    }

    #[test]
    fn test_completed_statuses() {
        assert!(OrderStatus::Finished.is_completed());
        assert!(OrderStatus::Delivered.is_completed());
        assert!(!OrderStatus::InRepair.is_completed());
    }

    #[test]
    fn test_sparse_order_defaults() {
        let order: ServiceOrder = serde_json::from_str(
            r#"{"id":"o1","orderNumber":1001,"customerId":"c1","equipmentId":"e1",
                "status":"Em Reparo","createdAt":"2024-05-01T10:00:00Z",
                "updatedAt":"2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(order.status, OrderStatus::InRepair);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.diagnosis_fee, Decimal::ZERO);
        assert_eq!(order.warranty_days, 90);
        assert!(order.history.is_empty());
    }

    #[test]
    fn test_sort_key_orders_numerically() {
        let a = ServiceOrder {
            order_number: 999,
            ..ServiceOrder::default()
        };
        let b = ServiceOrder {
            order_number: 1001,
            ..ServiceOrder::default()
        };
        assert!(a.sort_key() < b.sort_key());
    }

    #[test]
    fn test_occurrence_type_field() {
        let occurrence = Occurrence {
            id: "x".to_string(),
            description: "Tela trincada na chegada".to_string(),
            timestamp: Utc::now(),
            kind: OccurrenceKind::Alert,
        };
        let json = serde_json::to_value(&occurrence).unwrap();
        assert_eq!(json["type"], "Alerta");
    }
}
