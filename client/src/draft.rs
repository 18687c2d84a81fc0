// Group creation form buffer
// Writes are unvalidated so the user can type freely; checking happens at submit time

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::watch::Watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DraftField {
    Name,
    Description,
    AcceptedTokenAddress,
    AcceptedRate,
    TokenName,
    TokenSymbol,
    LoanDurationMonths,
    InterestRate,
}

impl DraftField {
    /// Form order
    pub const ALL: [DraftField; 8] = [
        DraftField::Name,
        DraftField::Description,
        DraftField::AcceptedTokenAddress,
        DraftField::AcceptedRate,
        DraftField::TokenName,
        DraftField::TokenSymbol,
        DraftField::LoanDurationMonths,
        DraftField::InterestRate,
    ];

    /// Input name used by the page
    pub fn key(self) -> &'static str {
        match self {
            DraftField::Name => "name",
            DraftField::Description => "description",
            DraftField::AcceptedTokenAddress => "acceptedTokenAddress",
            DraftField::AcceptedRate => "acceptedRate",
            DraftField::TokenName => "tokenName",
            DraftField::TokenSymbol => "tokenSymbol",
            DraftField::LoanDurationMonths => "loanDurationMonths",
            DraftField::InterestRate => "interestRate",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DraftField::Name => "Name",
            DraftField::Description => "Description",
            DraftField::AcceptedTokenAddress => "Accepted Token",
            DraftField::AcceptedRate => "Accepted Rate",
            DraftField::TokenName => "Group Token Name",
            DraftField::TokenSymbol => "Token Symbol",
            DraftField::LoanDurationMonths => "Max Loan Duration",
            DraftField::InterestRate => "Interest Rate",
        }
    }

    /// Description and accepted token only feed the metadata document
    pub fn is_required(self) -> bool {
        !matches!(
            self,
            DraftField::Description | DraftField::AcceptedTokenAddress
        )
    }
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown form field: {0}")]
pub struct UnknownField(pub String);

impl FromStr for DraftField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DraftField::ALL
            .into_iter()
            .find(|field| field.key() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// Raw user input for a new group, exactly as typed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDraft {
    pub name: String,
    pub description: String,
    pub accepted_token_address: String,
    pub accepted_rate: String,
    pub token_name: String,
    pub token_symbol: String,
    pub loan_duration_months: String,
    pub interest_rate: String,
}

impl GroupDraft {
    pub fn get(&self, field: DraftField) -> &str {
        match field {
            DraftField::Name => &self.name,
            DraftField::Description => &self.description,
            DraftField::AcceptedTokenAddress => &self.accepted_token_address,
            DraftField::AcceptedRate => &self.accepted_rate,
            DraftField::TokenName => &self.token_name,
            DraftField::TokenSymbol => &self.token_symbol,
            DraftField::LoanDurationMonths => &self.loan_duration_months,
            DraftField::InterestRate => &self.interest_rate,
        }
    }

    fn slot(&mut self, field: DraftField) -> &mut String {
        match field {
            DraftField::Name => &mut self.name,
            DraftField::Description => &mut self.description,
            DraftField::AcceptedTokenAddress => &mut self.accepted_token_address,
            DraftField::AcceptedRate => &mut self.accepted_rate,
            DraftField::TokenName => &mut self.token_name,
            DraftField::TokenSymbol => &mut self.token_symbol,
            DraftField::LoanDurationMonths => &mut self.loan_duration_months,
            DraftField::InterestRate => &mut self.interest_rate,
        }
    }

    pub fn set(&mut self, field: DraftField, value: impl Into<String>) {
        *self.slot(field) = value.into();
    }

    pub fn is_empty(&self) -> bool {
        *self == GroupDraft::default()
    }
}

/// The form's mutable buffer, shared with the submission pipeline
#[derive(Clone, Default)]
pub struct FormState {
    draft: Watch<GroupDraft>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_field(&self, field: DraftField, value: impl Into<String>) {
        let value = value.into();
        self.draft.update(|draft| draft.set(field, value));
    }

    /// Same as `set_field`, keyed by the page's input name
    pub fn set_named_field(&self, name: &str, value: impl Into<String>) -> Result<(), UnknownField> {
        let field = name.parse::<DraftField>()?;
        self.set_field(field, value);
        Ok(())
    }

    pub fn field(&self, field: DraftField) -> String {
        self.draft.get().get(field).to_string()
    }

    /// Detached copy; later edits never reach an in-flight submission
    pub fn snapshot(&self) -> GroupDraft {
        self.draft.get()
    }

    pub fn clear(&self) {
        self.draft.set(GroupDraft::default());
    }

    pub fn subscribe(&self, listener: impl Fn(&GroupDraft) + 'static) {
        self.draft.subscribe(listener);
    }
}
