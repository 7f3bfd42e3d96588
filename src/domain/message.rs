//! Generated ISO 20022 message, owned by exactly one settlement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "message_kind")]
pub enum MessageKind {
    /// FIToFICustomerCreditTransfer
    #[sqlx(rename = "pacs.008")]
    #[serde(rename = "pacs.008")]
    Pacs008,
    /// BankToCustomerDebitCreditNotification
    #[sqlx(rename = "camt.054")]
    #[serde(rename = "camt.054")]
    Camt054,
    /// BankToCustomerStatement
    #[sqlx(rename = "camt.053")]
    #[serde(rename = "camt.053")]
    Camt053,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pacs008 => "pacs.008",
            Self::Camt054 => "camt.054",
            Self::Camt053 => "camt.053",
        }
    }

    /// ISO 20022 document namespace for this kind.
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::Pacs008 => "urn:iso:std:iso:20022:tech:xsd:pacs.008.001.08",
            Self::Camt054 => "urn:iso:std:iso:20022:tech:xsd:camt.054.001.08",
            Self::Camt053 => "urn:iso:std:iso:20022:tech:xsd:camt.053.001.08",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct IsoMessage {
    pub id: Uuid,
    pub settlement_id: Uuid,
    pub kind: MessageKind,
    pub xml_content: String,
    pub created_at: DateTime<Utc>,
}

impl IsoMessage {
    pub fn new(settlement_id: Uuid, kind: MessageKind, xml_content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            settlement_id,
            kind,
            xml_content,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_namespaces() {
        assert!(MessageKind::Pacs008.namespace().ends_with("pacs.008.001.08"));
        assert!(MessageKind::Camt054.namespace().ends_with("camt.054.001.08"));
        assert!(MessageKind::Camt053.namespace().ends_with("camt.053.001.08"));
    }

    #[test]
    fn test_kind_serde_names() {
        assert_eq!(
            serde_json::to_string(&MessageKind::Pacs008).unwrap(),
            "\"pacs.008\""
        );
    }
}
