//! Bank accounts and bank-statement lines.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{common::*, entry::TransactionType, money::Money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankAccountType {
    Savings,
    Current,
    CashCredit,
    Overdraft,
    Other,
}

impl fmt::Display for BankAccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BankAccountType::Savings => "Savings",
            BankAccountType::Current => "Current",
            BankAccountType::CashCredit => "Cash Credit",
            BankAccountType::Overdraft => "Overdraft",
            BankAccountType::Other => "Other",
        };
        f.write_str(label)
    }
}

/// Descriptive fields of a bank account that may be edited freely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankAccountDetails {
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub account_type: Option<BankAccountType>,
}

/// A bank account whose balance is driven by postings, never overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: AccountId,
    pub bank_name: String,
    pub account_number: String,
    pub account_type: BankAccountType,
    current_balance: Money,
}

impl BankAccount {
    pub fn new(
        bank_name: impl Into<String>,
        account_number: impl Into<String>,
        account_type: BankAccountType,
        opening_balance: Money,
    ) -> Self {
        Self {
            id: AccountId::new(),
            bank_name: bank_name.into(),
            account_number: account_number.into(),
            account_type,
            current_balance: opening_balance,
        }
    }

    pub fn current_balance(&self) -> Money {
        self.current_balance
    }

    /// Applies a partial update. The balance is not part of the details and
    /// stays untouched.
    pub fn with_details(mut self, details: BankAccountDetails) -> Self {
        if let Some(bank_name) = details.bank_name {
            self.bank_name = bank_name;
        }
        if let Some(account_number) = details.account_number {
            self.account_number = account_number;
        }
        if let Some(account_type) = details.account_type {
            self.account_type = account_type;
        }
        self
    }

    /// Moves the balance by `delta`. Callers go through the account book so
    /// every movement is a posting, reconciliation or explicit adjustment.
    pub fn apply_delta(&mut self, delta: Money) {
        self.current_balance += delta;
    }

    /// Last four characters of the account number for display.
    pub fn masked_number(&self) -> String {
        let chars: Vec<char> = self.account_number.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
        format!("XXXX{tail}")
    }
}

impl Identifiable for BankAccount {
    type Id = AccountId;

    fn id(&self) -> AccountId {
        self.id
    }
}

impl Displayable for BankAccount {
    fn display_label(&self) -> String {
        format!(
            "{} {} ({})",
            self.bank_name,
            self.masked_number(),
            self.account_type
        )
    }
}

/// One line of an externally supplied bank statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    pub id: BankTransactionId,
    pub account_id: AccountId,
    pub date: NaiveDate,
    pub kind: TransactionType,
    pub amount: Money,
    #[serde(default)]
    pub description: String,
}

impl BankTransaction {
    pub fn new(
        id: u64,
        account_id: AccountId,
        date: NaiveDate,
        kind: TransactionType,
        amount: Money,
    ) -> Self {
        Self {
            id: BankTransactionId(id),
            account_id,
            date,
            kind,
            amount,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn signed_amount(&self) -> Money {
        self.kind.signed(self.amount)
    }
}

impl Identifiable for BankTransaction {
    type Id = BankTransactionId;

    fn id(&self) -> BankTransactionId {
        self.id
    }
}
