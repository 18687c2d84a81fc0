//! Conversions from typed form input to `createNewGroup` arguments
//!
//! Everything in here is pure. Inputs that cannot be represented exactly are
//! rejected; nothing is truncated or rounded.

use ethers_core::abi::Token;
use ethers_core::types::{Address, H256, U256};
use ethers_core::utils::to_checksum;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::draft::{DraftField, GroupDraft};
use crate::error::{CodecError, FieldError, ValidationError};

/// Usable bytes in a `bytes32` string; the last byte stays zero as terminator
pub const FIXED_STRING_CAPACITY: usize = 31;

/// Interest rates are percentages with two decimals, stored as basis points
pub const INTEREST_RATE_DECIMALS: u8 = 2;

/// Largest power of ten that fits in a `uint256`
pub const MAX_DECIMALS: u8 = 77;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Days,
    Weeks,
    #[default]
    Months,
}

impl DurationUnit {
    pub fn seconds(self) -> u64 {
        const DAY: u64 = 24 * 60 * 60;
        match self {
            DurationUnit::Days => DAY,
            DurationUnit::Weeks => 7 * DAY,
            DurationUnit::Months => 30 * DAY,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DurationUnit::Days => "day",
            DurationUnit::Weeks => "week",
            DurationUnit::Months => "month",
        }
    }
}

/// Contract-defined scaling for the numeric fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecParams {
    /// Base-unit decimals of the accepted rate (18 for wei-style tokens)
    pub rate_decimals: u8,
    pub duration_unit: DurationUnit,
}

impl Default for CodecParams {
    fn default() -> Self {
        Self {
            rate_decimals: 18,
            duration_unit: DurationUnit::Months,
        }
    }
}

pub fn encode_fixed_string(s: &str) -> Result<[u8; 32], CodecError> {
    let bytes = s.as_bytes();
    if bytes.len() > FIXED_STRING_CAPACITY {
        return Err(CodecError::FieldTooLong {
            len: bytes.len(),
            capacity: FIXED_STRING_CAPACITY,
        });
    }
    if bytes.contains(&0) {
        return Err(CodecError::EmbeddedNul);
    }

    let mut out = [0u8; 32];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(out)
}

/// Inverse of [`encode_fixed_string`]; `None` if the bytes are not UTF-8
pub fn decode_fixed_string(bytes: &[u8; 32]) -> Option<String> {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8(bytes[..end].to_vec()).ok()
}

/// Parse a plain non-negative decimal and scale it by `10^decimals`
///
/// Accepts `12`, `0.05`, `007.50`. Rejects signs, exponents, separators, and a
/// dot without digits on both sides.
fn parse_scaled(input: &str, decimals: u8) -> Result<U256, CodecError> {
    let invalid = || CodecError::InvalidNumericFormat(input.to_string());
    let s = input.trim();

    let (whole, frac) = match s.split_once('.') {
        Some((whole, frac)) if frac.is_empty() => (whole, None),
        Some((whole, frac)) => (whole, Some(frac)),
        None => (s, Some("")),
    };
    let frac = frac.ok_or_else(invalid)?;
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let frac = frac.trim_end_matches('0');
    if frac.len() > decimals as usize {
        return Err(CodecError::TooPrecise {
            max_decimals: decimals,
        });
    }

    let padding = "0".repeat(decimals as usize - frac.len());
    let digits = format!("{}{}{}", whole, frac, padding);
    U256::from_dec_str(&digits)
        .map_err(|_| CodecError::OutOfRange(format!("{} does not fit in 256 bits", s)))
}

/// Human decimal to integer base units, e.g. `"0.05"` at 18 decimals is `5 * 10^16`
pub fn encode_rate(decimal: &str, decimals: u8) -> Result<U256, CodecError> {
    if decimals > MAX_DECIMALS {
        return Err(CodecError::OutOfRange(format!(
            "{} decimals exceeds {}",
            decimals, MAX_DECIMALS
        )));
    }
    parse_scaled(decimal, decimals)
}

/// Whole number of `unit`s, converted to seconds
pub fn encode_duration(count: &str, unit: DurationUnit) -> Result<U256, CodecError> {
    let count = parse_scaled(count, 0).map_err(|e| match e {
        CodecError::TooPrecise { .. } => CodecError::InvalidNumericFormat(count.to_string()),
        other => other,
    })?;
    if count.is_zero() {
        return Err(CodecError::OutOfRange(format!(
            "duration must be at least one {}",
            unit.label()
        )));
    }
    count
        .checked_mul(U256::from(unit.seconds()))
        .ok_or_else(|| CodecError::OutOfRange("duration overflows uint256".to_string()))
}

/// Percentage to `uint16` basis points: `"3"` is 300, `"3.25"` is 325
pub fn encode_interest_rate(percent: &str) -> Result<u16, CodecError> {
    let bps = parse_scaled(percent, INTEREST_RATE_DECIMALS)?;
    if bps > U256::from(u16::MAX) {
        return Err(CodecError::OutOfRange(format!(
            "{}% exceeds the maximum of 655.35%",
            percent.trim()
        )));
    }
    Ok(bps.low_u32() as u16)
}

/// Hex address; mixed-case input must carry a valid EIP-55 checksum
pub fn parse_address(s: &str) -> Result<Address, CodecError> {
    let invalid = || CodecError::InvalidAddress(s.to_string());
    let trimmed = s.trim();
    let hex_part = trimmed.strip_prefix("0x").ok_or_else(invalid)?;
    if hex_part.len() != 40 {
        return Err(invalid());
    }

    let address: Address = trimmed.parse().map_err(|_| invalid())?;
    let mixed_case = hex_part.chars().any(|c| c.is_ascii_lowercase())
        && hex_part.chars().any(|c| c.is_ascii_uppercase());
    if mixed_case && to_checksum(&address, None) != trimmed {
        return Err(invalid());
    }
    Ok(address)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GroupMetadata<'a> {
    name: &'a str,
    description: &'a str,
    accepted_token: Option<Address>,
}

/// Keccak-256 of the canonical JSON metadata document
pub fn metadata_hash(draft: &GroupDraft, accepted_token: Option<Address>) -> H256 {
    let document = GroupMetadata {
        name: &draft.name,
        description: &draft.description,
        accepted_token,
    };
    // Serializing a struct of strings and an optional address cannot fail
    let bytes = serde_json::to_vec(&document).unwrap_or_default();
    H256::from_slice(&Keccak256::digest(&bytes))
}

/// A draft whose every field passed its validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedDraft {
    pub name: String,
    pub fixed_name: [u8; 32],
    pub accepted_rate: U256,
    pub token_name: String,
    pub token_symbol: String,
    pub loan_duration: U256,
    pub interest_rate: u16,
    pub accepted_token: Option<Address>,
    pub metadata_hash: H256,
}

fn check<T>(
    errors: &mut Vec<FieldError>,
    field: DraftField,
    result: Result<T, CodecError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            errors.push(FieldError { field, error });
            None
        }
    }
}

/// Run every validator and report all failing fields, not just the first
pub fn validate_draft(
    draft: &GroupDraft,
    params: &CodecParams,
) -> Result<CheckedDraft, ValidationError> {
    let mut errors = Vec::new();

    for field in DraftField::ALL {
        if field.is_required() && draft.get(field).trim().is_empty() {
            errors.push(FieldError {
                field,
                error: CodecError::Required,
            });
        }
    }
    let present = |field: DraftField| !draft.get(field).trim().is_empty();

    let fixed_name = if present(DraftField::Name) {
        check(&mut errors, DraftField::Name, encode_fixed_string(&draft.name))
    } else {
        None
    };
    let accepted_token = if present(DraftField::AcceptedTokenAddress) {
        check(
            &mut errors,
            DraftField::AcceptedTokenAddress,
            parse_address(&draft.accepted_token_address),
        )
        .map(Some)
    } else {
        Some(None)
    };
    let accepted_rate = if present(DraftField::AcceptedRate) {
        check(
            &mut errors,
            DraftField::AcceptedRate,
            encode_rate(&draft.accepted_rate, params.rate_decimals),
        )
    } else {
        None
    };
    let loan_duration = if present(DraftField::LoanDurationMonths) {
        check(
            &mut errors,
            DraftField::LoanDurationMonths,
            encode_duration(&draft.loan_duration_months, params.duration_unit),
        )
    } else {
        None
    };
    let interest_rate = if present(DraftField::InterestRate) {
        check(
            &mut errors,
            DraftField::InterestRate,
            encode_interest_rate(&draft.interest_rate),
        )
    } else {
        None
    };

    match (
        fixed_name,
        accepted_token,
        accepted_rate,
        loan_duration,
        interest_rate,
    ) {
        (
            Some(fixed_name),
            Some(accepted_token),
            Some(accepted_rate),
            Some(loan_duration),
            Some(interest_rate),
        ) if errors.is_empty() => Ok(CheckedDraft {
            name: draft.name.clone(),
            fixed_name,
            accepted_rate,
            token_name: draft.token_name.clone(),
            token_symbol: draft.token_symbol.clone(),
            loan_duration,
            interest_rate,
            accepted_token,
            metadata_hash: metadata_hash(draft, accepted_token),
        }),
        _ => {
            errors.sort_by_key(|e| DraftField::ALL.iter().position(|f| *f == e.field));
            Err(ValidationError { fields: errors })
        }
    }
}

/// Contract-ready `createNewGroup` arguments, rebuilt on every attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedGroupArgs {
    pub name: String,
    pub fixed_name: [u8; 32],
    pub beneficiary: Address,
    pub accepted_rate: U256,
    pub token_name: String,
    pub token_symbol: String,
    pub loan_duration: U256,
    pub interest_rate: u16,
    pub metadata_hash: H256,
}

impl EncodedGroupArgs {
    pub fn new(checked: CheckedDraft, beneficiary: Address) -> Self {
        Self {
            name: checked.name,
            fixed_name: checked.fixed_name,
            beneficiary,
            accepted_rate: checked.accepted_rate,
            token_name: checked.token_name,
            token_symbol: checked.token_symbol,
            loan_duration: checked.loan_duration,
            interest_rate: checked.interest_rate,
            metadata_hash: checked.metadata_hash,
        }
    }

    /// Positional ABI tokens in `createNewGroup` order
    pub fn to_tokens(&self) -> Vec<Token> {
        vec![
            Token::FixedBytes(self.fixed_name.to_vec()),
            Token::Address(self.beneficiary),
            Token::Uint(self.accepted_rate),
            Token::String(self.token_name.clone()),
            Token::String(self.token_symbol.clone()),
            Token::Uint(self.loan_duration),
            Token::Uint(U256::from(self.interest_rate)),
            Token::FixedBytes(self.metadata_hash.as_bytes().to_vec()),
        ]
    }
}
