//! Daybook entries and their typed links to originating documents.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{common::*, money::Money};

/// Direction of a posting against an account balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Credit,
    Debit,
}

impl TransactionType {
    /// `+1` for credits, `-1` for debits.
    pub fn sign(self) -> i64 {
        match self {
            TransactionType::Credit => 1,
            TransactionType::Debit => -1,
        }
    }

    /// Applies the posting direction to an amount.
    pub fn signed(self, amount: Money) -> Money {
        match self {
            TransactionType::Credit => amount,
            TransactionType::Debit => -amount,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            TransactionType::Credit => TransactionType::Debit,
            TransactionType::Debit => TransactionType::Credit,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionType::Credit => "Credit",
            TransactionType::Debit => "Debit",
        };
        f.write_str(label)
    }
}

/// Kind of business document a ledger entry originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Invoice,
    CarPayment,
    Salary,
    Advance,
    BankTransfer,
    Other,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DocumentKind::Invoice => "Invoice",
            DocumentKind::CarPayment => "Car Payment",
            DocumentKind::Salary => "Salary",
            DocumentKind::Advance => "Advance",
            DocumentKind::BankTransfer => "Bank Transfer",
            DocumentKind::Other => "Other",
        };
        f.write_str(label)
    }
}

/// Foreign-key style link from an entry to its source document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    pub kind: DocumentKind,
    pub id: String,
}

impl DocumentRef {
    pub fn new(kind: DocumentKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// A single dated credit or debit recorded in the daybook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub date: NaiveDate,
    pub kind: TransactionType,
    pub amount: Money,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub account_head: String,
    #[serde(default)]
    pub sub_account: String,
    #[serde(default)]
    pub reference_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payee_id: Option<PayeeId>,
    /// Computed by the balance accumulator; ignored on input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running_balance: Option<Money>,
}

impl LedgerEntry {
    pub fn new(id: EntryId, date: NaiveDate, kind: TransactionType, amount: Money) -> Self {
        Self {
            id,
            date,
            kind,
            amount,
            category: String::new(),
            account_head: String::new(),
            sub_account: String::new(),
            reference_number: String::new(),
            document: None,
            account_id: None,
            payee_id: None,
            running_balance: None,
        }
    }

    pub fn credit(id: u64, date: NaiveDate, amount: Money) -> Self {
        Self::new(EntryId(id), date, TransactionType::Credit, amount)
    }

    pub fn debit(id: u64, date: NaiveDate, amount: Money) -> Self {
        Self::new(EntryId(id), date, TransactionType::Debit, amount)
    }

    /// Sets category, account head and sub-account in one call.
    pub fn classified(
        mut self,
        category: impl Into<String>,
        account_head: impl Into<String>,
        sub_account: impl Into<String>,
    ) -> Self {
        self.category = category.into();
        self.account_head = account_head.into();
        self.sub_account = sub_account.into();
        self
    }

    pub fn with_reference(mut self, reference_number: impl Into<String>) -> Self {
        self.reference_number = reference_number.into();
        self
    }

    pub fn with_document(mut self, document: DocumentRef) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_account(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn with_payee(mut self, payee_id: PayeeId) -> Self {
        self.payee_id = Some(payee_id);
        self
    }

    /// Signed effect of this entry on a balance.
    pub fn signed_amount(&self) -> Money {
        self.kind.signed(self.amount)
    }

    pub fn is_linked_to(&self, kind: DocumentKind) -> bool {
        self.document.as_ref().is_some_and(|doc| doc.kind == kind)
    }
}

impl Identifiable for LedgerEntry {
    type Id = EntryId;

    fn id(&self) -> EntryId {
        self.id
    }
}

impl Displayable for LedgerEntry {
    fn display_label(&self) -> String {
        format!("{} {} {} {}", self.id, self.date, self.kind, self.amount)
    }
}
