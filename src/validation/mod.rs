use bigdecimal::BigDecimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub mod withdrawal;

pub use withdrawal::{collect_withdrawal, MethodDetailsInput, WithdrawalInput};

pub const WALLET_ADDRESS_LEN: usize = 42;
pub const ACCOUNT_NUMBER_MAX_LEN: usize = 34;
pub const NAME_MAX_LEN: usize = 100;
pub const EMAIL_MAX_LEN: usize = 254;
pub const UPI_LOCAL_MIN_LEN: usize = 2;
pub const UPI_LOCAL_MAX_LEN: usize = 256;
pub const UPI_HANDLE_MIN_LEN: usize = 3;
pub const UPI_HANDLE_MAX_LEN: usize = 65;
pub const TRANSACTION_ID_MAX_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

/// Every field error of one submission, keyed by wire field name. Only the
/// first error per field is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.entry(error.field).or_insert(error.message);
    }

    /// Records the error, if any, and hands back the success value.
    pub fn check<T>(&mut self, result: Result<T, ValidationError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.push(error);
                None
            }
        }
    }

    pub fn extend(&mut self, other: FieldErrors) {
        for (field, message) in other.0 {
            self.0.entry(field).or_insert(message);
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<ValidationError> for FieldErrors {
    fn from(error: ValidationError) -> Self {
        let mut errors = FieldErrors::new();
        errors.push(error);
        errors
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

impl std::error::Error for FieldErrors {}

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

/// Wallet SDK transaction ids: `[A-Za-z0-9_-]`, at most 128 characters.
pub fn validate_transaction_id(value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    validate_required("transactionId", value)?;
    validate_max_len("transactionId", value, TRANSACTION_ID_MAX_LEN)?;

    if !value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
    {
        return Err(ValidationError::new(
            "transactionId",
            "must contain only letters, digits, '_' or '-'",
        ));
    }

    Ok(value.to_string())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.chars().count() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

pub fn validate_positive_amount(amount: &BigDecimal) -> ValidationResult {
    if amount <= &BigDecimal::from(0) {
        return Err(ValidationError::new("amount", "Please enter a valid amount"));
    }

    Ok(())
}

/// Reads an amount sent either as a JSON string or a JSON number. Numbers
/// go through their shortest decimal text so `0.15` stays `0.15`.
pub fn parse_amount(value: &serde_json::Value) -> Result<BigDecimal, ValidationError> {
    let invalid = || ValidationError::new("amount", "Please enter a valid amount");
    let text = match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Null => {
            return Err(ValidationError::new("amount", "Amount is required"));
        }
        _ => return Err(invalid()),
    };

    let amount = BigDecimal::from_str(&text).map_err(|_| invalid())?;
    validate_positive_amount(&amount)?;
    Ok(amount)
}

/// `0x` followed by 40 hex characters. Returned lowercased.
pub fn validate_wallet_address(address: &str) -> Result<String, ValidationError> {
    let address = sanitize_string(address);
    if address.is_empty() {
        return Err(ValidationError::new("address", "Wallet address is required"));
    }

    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .filter(|_| address.len() == WALLET_ADDRESS_LEN)
        .ok_or_else(|| {
            ValidationError::new("address", "must be a 0x-prefixed 20-byte hex address")
        })?;

    if !hex_part.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(ValidationError::new(
            "address",
            "must be a 0x-prefixed 20-byte hex address",
        ));
    }

    Ok(address.to_lowercase())
}

/// `local@handle`: local part of 2-256 chars from `[A-Za-z0-9.-]`, handle of
/// 3-65 letters starting with a letter.
pub fn validate_upi_id(upi_id: &str) -> Result<String, ValidationError> {
    let upi_id = upi_id.trim();
    if upi_id.is_empty() {
        return Err(ValidationError::new("upiId", "UPI ID is required"));
    }

    let invalid = || ValidationError::new("upiId", "Please enter a valid UPI ID");
    let (local, handle) = upi_id.split_once('@').ok_or_else(invalid)?;

    let local_ok = (UPI_LOCAL_MIN_LEN..=UPI_LOCAL_MAX_LEN).contains(&local.len())
        && local
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '.' || ch == '-');
    let handle_ok = (UPI_HANDLE_MIN_LEN..=UPI_HANDLE_MAX_LEN).contains(&handle.len())
        && handle.chars().all(|ch| ch.is_ascii_alphabetic());

    if !local_ok || !handle_ok {
        return Err(invalid());
    }

    Ok(upi_id.to_string())
}

pub fn validate_phone_number(label: &str, phone: &str) -> Result<String, ValidationError> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err(ValidationError::new(
            "phoneNumber",
            format!("{} is required", label),
        ));
    }

    if phone.len() != 10 || !phone.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ValidationError::new(
            "phoneNumber",
            "Please enter a valid 10-digit number",
        ));
    }

    Ok(phone.to_string())
}

/// Four bank letters, a literal `0`, then six alphanumerics. Uppercased first.
pub fn validate_ifsc(ifsc: &str) -> Result<String, ValidationError> {
    let ifsc = ifsc.trim().to_uppercase();
    if ifsc.is_empty() {
        return Err(ValidationError::new("ifscCode", "IFSC code is required"));
    }

    let chars: Vec<char> = ifsc.chars().collect();
    let valid = chars.len() == 11
        && chars[..4].iter().all(|ch| ch.is_ascii_uppercase())
        && chars[4] == '0'
        && chars[5..]
            .iter()
            .all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit());

    if !valid {
        return Err(ValidationError::new(
            "ifscCode",
            "Please enter a valid IFSC code",
        ));
    }

    Ok(ifsc)
}

pub fn validate_account_number(account_number: &str) -> Result<String, ValidationError> {
    let account_number: String = account_number.chars().filter(|ch| !ch.is_whitespace()).collect();
    if account_number.is_empty() {
        return Err(ValidationError::new(
            "accountNumber",
            "Account number is required",
        ));
    }

    validate_max_len("accountNumber", &account_number, ACCOUNT_NUMBER_MAX_LEN)?;
    if !account_number.chars().all(|ch| ch.is_ascii_alphanumeric()) {
        return Err(ValidationError::new(
            "accountNumber",
            "Please enter a valid account number",
        ));
    }

    Ok(account_number)
}

pub fn validate_name(field: &'static str, label: &str, value: &str) -> Result<String, ValidationError> {
    let value = sanitize_string(value);
    if value.is_empty() {
        return Err(ValidationError::new(field, format!("{} is required", label)));
    }
    validate_max_len(field, &value, NAME_MAX_LEN)?;

    Ok(value)
}

/// Twelve digits; spaces are accepted on input and stripped.
pub fn validate_aadhaar(number: &str) -> Result<String, ValidationError> {
    let digits: String = number.chars().filter(|ch| !ch.is_whitespace()).collect();
    if digits.is_empty() {
        return Err(ValidationError::new(
            "verificationNumber",
            "Aadhaar number is required",
        ));
    }

    if digits.len() != 12 || !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ValidationError::new(
            "verificationNumber",
            "Aadhaar number must be 12 digits",
        ));
    }

    Ok(digits)
}

/// Five letters, four digits, one letter, after uppercasing.
pub fn validate_pan(number: &str) -> Result<String, ValidationError> {
    let pan = number.trim().to_uppercase();
    if pan.is_empty() {
        return Err(ValidationError::new(
            "verificationNumber",
            "PAN number is required",
        ));
    }

    let chars: Vec<char> = pan.chars().collect();
    let valid = chars.len() == 10
        && chars[..5].iter().all(|ch| ch.is_ascii_uppercase())
        && chars[5..9].iter().all(|ch| ch.is_ascii_digit())
        && chars[9].is_ascii_uppercase();

    if !valid {
        return Err(ValidationError::new(
            "verificationNumber",
            "Please enter a valid PAN number",
        ));
    }

    Ok(pan)
}

pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ValidationError::new("email", "Please enter your email address"));
    }
    validate_max_len("email", &email, EMAIL_MAX_LEN)?;

    let invalid = || ValidationError::new("email", "Please enter a valid email address");
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    let clean = |part: &str| !part.is_empty() && !part.chars().any(|ch| ch.is_whitespace() || ch == '@');

    let dotted = domain
        .char_indices()
        .any(|(i, ch)| ch == '.' && i > 0 && i < domain.len() - 1);

    if !clean(local) || !clean(domain) || !dotted {
        return Err(invalid());
    }

    Ok(email)
}
