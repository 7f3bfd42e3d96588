//! XML builders for the supported message kinds.
//!
//! Pure functions of their input: the creation timestamp is passed in
//! rather than read from the clock, so two generations from the same
//! settlement fields are byte-identical when given the same timestamp.
//! Every identifier is embedded verbatim; nothing is recomputed or looked
//! up here.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::{MessageKind, Settlement};

#[derive(Error, Debug)]
pub enum IsoError {
    #[error("XML write failed: {0}")]
    Xml(#[from] std::io::Error),
    #[error("Generated document is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Kind {0:?} requires statement input")]
    StatementInputRequired(MessageKind),
}

/// Settlement fields consumed by the payment-message builders.
#[derive(Debug, Clone)]
pub struct PaymentFields {
    pub uetr: String,
    pub end_to_end_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub debtor_name: String,
    pub debtor_account: String,
    pub creditor_name: String,
    pub creditor_account: String,
    pub ledger_tx_hash: String,
}

impl PaymentFields {
    pub fn from_settlement(settlement: &Settlement) -> Self {
        Self {
            uetr: settlement.uetr.clone(),
            end_to_end_id: settlement.end_to_end_id.clone(),
            amount: settlement.amount,
            currency: settlement.currency.clone(),
            debtor_name: settlement.debtor_name.clone(),
            debtor_account: settlement.debtor_address.clone(),
            creditor_name: settlement.creditor_name.clone(),
            creditor_account: settlement.creditor_address.clone(),
            ledger_tx_hash: settlement.ledger_tx_hash.clone(),
        }
    }

    fn check(&self) -> Result<(), IsoError> {
        let required: [(&'static str, &str); 7] = [
            ("uetr", &self.uetr),
            ("end_to_end_id", &self.end_to_end_id),
            ("debtor_name", &self.debtor_name),
            ("debtor_account", &self.debtor_account),
            ("creditor_name", &self.creditor_name),
            ("creditor_account", &self.creditor_account),
            ("ledger_tx_hash", &self.ledger_tx_hash),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(IsoError::MissingField(name));
            }
        }
        Ok(())
    }
}

/// One transfer entry inside a camt.053 statement, in display order.
#[derive(Debug, Clone)]
pub struct StatementEntry {
    pub amount: Decimal,
    pub currency: String,
}

/// Input for the periodic statement builder.
#[derive(Debug, Clone)]
pub struct StatementFields {
    pub statement_id: String,
    pub account_id: String,
    pub account_name: String,
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
    pub entries: Vec<StatementEntry>,
}

/// Dispatches to the payment-message builder for `kind`.
pub fn generate(
    kind: MessageKind,
    fields: &PaymentFields,
    created_at: DateTime<Utc>,
) -> Result<String, IsoError> {
    match kind {
        MessageKind::Pacs008 => pacs008(fields, created_at),
        MessageKind::Camt054 => camt054(fields, created_at),
        MessageKind::Camt053 => Err(IsoError::StatementInputRequired(kind)),
    }
}

fn fmt_dt(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn fmt_amount(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

type XmlWriter = Writer<Vec<u8>>;

fn new_writer() -> Result<XmlWriter, IsoError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    Ok(writer)
}

fn open(writer: &mut XmlWriter, name: &str) -> Result<(), IsoError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    Ok(())
}

fn close(writer: &mut XmlWriter, name: &str) -> Result<(), IsoError> {
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn leaf(writer: &mut XmlWriter, name: &str, text: &str) -> Result<(), IsoError> {
    open(writer, name)?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    close(writer, name)
}

fn amount_leaf(
    writer: &mut XmlWriter,
    name: &str,
    currency: &str,
    amount: Decimal,
) -> Result<(), IsoError> {
    let mut start = BytesStart::new(name);
    start.push_attribute(("Ccy", currency));
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::new(&fmt_amount(amount))))?;
    close(writer, name)
}

fn open_document(writer: &mut XmlWriter, kind: MessageKind) -> Result<(), IsoError> {
    let mut root = BytesStart::new("Document");
    root.push_attribute(("xmlns", kind.namespace()));
    writer.write_event(Event::Start(root))?;
    Ok(())
}

fn finish(mut writer: XmlWriter) -> Result<String, IsoError> {
    writer.write_event(Event::End(BytesEnd::new("Document")))?;
    Ok(String::from_utf8(writer.into_inner())?)
}

/// pacs.008.001.08 — FIToFICustomerCreditTransfer.
pub fn pacs008(fields: &PaymentFields, created_at: DateTime<Utc>) -> Result<String, IsoError> {
    fields.check()?;
    let mut w = new_writer()?;
    open_document(&mut w, MessageKind::Pacs008)?;
    open(&mut w, "FIToFICstmrCdtTrf")?;

    open(&mut w, "GrpHdr")?;
    leaf(&mut w, "MsgId", &fields.uetr)?;
    leaf(&mut w, "CreDtTm", &fmt_dt(created_at))?;
    leaf(&mut w, "NbOfTxs", "1")?;
    close(&mut w, "GrpHdr")?;

    open(&mut w, "CdtTrfTxInf")?;
    open(&mut w, "PmtId")?;
    leaf(&mut w, "InstrId", &fields.uetr)?;
    leaf(&mut w, "EndToEndId", &fields.end_to_end_id)?;
    leaf(&mut w, "UETR", &fields.uetr)?;
    close(&mut w, "PmtId")?;

    amount_leaf(&mut w, "IntrBkSttlmAmt", &fields.currency, fields.amount)?;

    open(&mut w, "Dbtr")?;
    leaf(&mut w, "Nm", &fields.debtor_name)?;
    close(&mut w, "Dbtr")?;
    open(&mut w, "DbtrAcct")?;
    open(&mut w, "Id")?;
    open(&mut w, "Othr")?;
    leaf(&mut w, "Id", &fields.debtor_account)?;
    close(&mut w, "Othr")?;
    close(&mut w, "Id")?;
    close(&mut w, "DbtrAcct")?;

    open(&mut w, "Cdtr")?;
    leaf(&mut w, "Nm", &fields.creditor_name)?;
    close(&mut w, "Cdtr")?;
    open(&mut w, "CdtrAcct")?;
    open(&mut w, "Id")?;
    open(&mut w, "Othr")?;
    leaf(&mut w, "Id", &fields.creditor_account)?;
    close(&mut w, "Othr")?;
    close(&mut w, "Id")?;
    close(&mut w, "CdtrAcct")?;

    open(&mut w, "SplmtryData")?;
    open(&mut w, "Envlp")?;
    leaf(&mut w, "XRPLTxHash", &fields.ledger_tx_hash)?;
    close(&mut w, "Envlp")?;
    close(&mut w, "SplmtryData")?;

    close(&mut w, "CdtTrfTxInf")?;
    close(&mut w, "FIToFICstmrCdtTrf")?;
    finish(w)
}

/// camt.054.001.08 — BankToCustomerDebitCreditNotification.
pub fn camt054(fields: &PaymentFields, created_at: DateTime<Utc>) -> Result<String, IsoError> {
    fields.check()?;
    let mut w = new_writer()?;
    open_document(&mut w, MessageKind::Camt054)?;
    open(&mut w, "BkToCstmrDbtCdtNtfctn")?;

    open(&mut w, "GrpHdr")?;
    leaf(&mut w, "MsgId", &format!("NTFCTN-{}", fields.uetr))?;
    leaf(&mut w, "CreDtTm", &fmt_dt(created_at))?;
    close(&mut w, "GrpHdr")?;

    open(&mut w, "Ntfctn")?;
    leaf(&mut w, "Id", &fields.uetr)?;

    open(&mut w, "Ntry")?;
    amount_leaf(&mut w, "Amt", &fields.currency, fields.amount)?;
    leaf(&mut w, "CdtDbtInd", "CRDT")?;
    leaf(&mut w, "Sts", "BOOK")?;

    open(&mut w, "NtryDtls")?;
    open(&mut w, "TxDtls")?;
    open(&mut w, "Refs")?;
    leaf(&mut w, "EndToEndId", &fields.end_to_end_id)?;
    leaf(&mut w, "UETR", &fields.uetr)?;
    close(&mut w, "Refs")?;
    close(&mut w, "TxDtls")?;
    close(&mut w, "NtryDtls")?;

    close(&mut w, "Ntry")?;
    close(&mut w, "Ntfctn")?;
    close(&mut w, "BkToCstmrDbtCdtNtfctn")?;
    finish(w)
}

/// camt.053.001.08 — BankToCustomerStatement with a closing-balance
/// placeholder and one entry per transfer, in input order.
pub fn camt053(fields: &StatementFields, created_at: DateTime<Utc>) -> Result<String, IsoError> {
    if fields.statement_id.is_empty() {
        return Err(IsoError::MissingField("statement_id"));
    }
    if fields.account_id.is_empty() {
        return Err(IsoError::MissingField("account_id"));
    }
    let mut w = new_writer()?;
    open_document(&mut w, MessageKind::Camt053)?;
    open(&mut w, "BkToCstmrStmt")?;

    open(&mut w, "GrpHdr")?;
    leaf(&mut w, "MsgId", &fields.statement_id)?;
    leaf(&mut w, "CreDtTm", &fmt_dt(created_at))?;
    close(&mut w, "GrpHdr")?;

    open(&mut w, "Stmt")?;
    leaf(&mut w, "Id", &fields.statement_id)?;

    open(&mut w, "Acct")?;
    open(&mut w, "Id")?;
    open(&mut w, "Othr")?;
    leaf(&mut w, "Id", &fields.account_id)?;
    close(&mut w, "Othr")?;
    close(&mut w, "Id")?;
    leaf(&mut w, "Nm", &fields.account_name)?;
    close(&mut w, "Acct")?;

    open(&mut w, "FrToDt")?;
    leaf(&mut w, "FrDtTm", &fmt_dt(fields.from_date))?;
    leaf(&mut w, "ToDtTm", &fmt_dt(fields.to_date))?;
    close(&mut w, "FrToDt")?;

    // Closing balance placeholder; real balances are a ledger concern.
    open(&mut w, "Bal")?;
    open(&mut w, "Tp")?;
    open(&mut w, "CdOrPrtry")?;
    leaf(&mut w, "Cd", "CLBD")?;
    close(&mut w, "CdOrPrtry")?;
    close(&mut w, "Tp")?;
    amount_leaf(&mut w, "Amt", "XRP", Decimal::ZERO)?;
    leaf(&mut w, "CdtDbtInd", "CRDT")?;
    open(&mut w, "Dt")?;
    leaf(&mut w, "Dt", &created_at.format("%Y-%m-%d").to_string())?;
    close(&mut w, "Dt")?;
    close(&mut w, "Bal")?;

    for entry in &fields.entries {
        open(&mut w, "Ntry")?;
        amount_leaf(&mut w, "Amt", &entry.currency, entry.amount)?;
        leaf(&mut w, "CdtDbtInd", "CRDT")?;
        leaf(&mut w, "Sts", "BOOK")?;
        close(&mut w, "Ntry")?;
    }

    close(&mut w, "Stmt")?;
    close(&mut w, "BkToCstmrStmt")?;
    finish(w)
}
