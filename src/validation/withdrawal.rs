//! Withdrawal collector: turns raw payout fields into a [`ValidatedWithdrawal`].

use serde::Deserialize;

use super::{
    validate_aadhaar, validate_account_number, validate_ifsc, validate_name, validate_pan,
    validate_phone_number, validate_upi_id, FieldErrors, ValidationError,
};
use crate::domain::{
    IdentityVerification, ValidatedWithdrawal, VerificationType, WithdrawalDetails,
    WithdrawalMethod,
};

/// Destination fields as submitted. Only the ones the method needs are read.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDetailsInput {
    pub upi_id: Option<String>,
    #[serde(alias = "phonepeNumber", alias = "gpayNumber", alias = "paytmNumber")]
    pub phone_number: Option<String>,
    pub account_number: Option<String>,
    pub ifsc_code: Option<String>,
    pub account_name: Option<String>,
    pub bank_name: Option<String>,
}

/// Missing fields deserialize as empty and surface as field errors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WithdrawalInput {
    pub withdrawal_method: String,
    pub method_details: MethodDetailsInput,
    #[serde(alias = "verificationType")]
    pub verification_method: String,
    pub verification_number: String,
}

/// Validates every field and reports all failures at once.
pub fn collect_withdrawal(input: &WithdrawalInput) -> Result<ValidatedWithdrawal, FieldErrors> {
    let mut errors = FieldErrors::new();

    let method = errors.check(
        input
            .withdrawal_method
            .parse::<WithdrawalMethod>()
            .map_err(|_| ValidationError::new("withdrawalMethod", "Withdrawal method is required")),
    );
    let details = method.and_then(|method| collect_details(method, &input.method_details, &mut errors));

    let verification_type = errors.check(
        input
            .verification_method
            .parse::<VerificationType>()
            .map_err(|_| {
                ValidationError::new("verificationMethod", "Verification method must be aadhaar or pan")
            }),
    );
    let verification_number = verification_type.and_then(|kind| {
        let result = match kind {
            VerificationType::Aadhaar => validate_aadhaar(&input.verification_number),
            VerificationType::Pan => validate_pan(&input.verification_number),
        };
        errors.check(result)
    });

    match (details, verification_type, verification_number) {
        (Some(details), Some(verification_type), Some(verification_number)) if errors.is_empty() => {
            Ok(ValidatedWithdrawal {
                details,
                verification: IdentityVerification {
                    verification_type,
                    verification_number,
                },
            })
        }
        _ => Err(errors),
    }
}

fn collect_details(
    method: WithdrawalMethod,
    fields: &MethodDetailsInput,
    errors: &mut FieldErrors,
) -> Option<WithdrawalDetails> {
    let field = |value: &Option<String>| value.clone().unwrap_or_default();

    match method {
        WithdrawalMethod::Upi => errors
            .check(validate_upi_id(&field(&fields.upi_id)))
            .map(|upi_id| WithdrawalDetails::Upi { upi_id }),
        WithdrawalMethod::Phonepe | WithdrawalMethod::Gpay | WithdrawalMethod::Paytm => errors
            .check(validate_phone_number(method.phone_label(), &field(&fields.phone_number)))
            .and_then(|phone| WithdrawalDetails::phone(method, phone)),
        WithdrawalMethod::Bank => {
            let account_number = errors.check(validate_account_number(&field(&fields.account_number)));
            let ifsc_code = errors.check(validate_ifsc(&field(&fields.ifsc_code)));
            let account_name = errors.check(validate_name(
                "accountName",
                "Account holder name",
                &field(&fields.account_name),
            ));
            let bank_name =
                errors.check(validate_name("bankName", "Bank name", &field(&fields.bank_name)));

            match (account_number, ifsc_code, account_name, bank_name) {
                (Some(account_number), Some(ifsc_code), Some(account_name), Some(bank_name)) => {
                    Some(WithdrawalDetails::Bank {
                        account_number,
                        ifsc_code,
                        account_name,
                        bank_name,
                    })
                }
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(method: &str, details: MethodDetailsInput, kind: &str, number: &str) -> WithdrawalInput {
        WithdrawalInput {
            withdrawal_method: method.to_string(),
            method_details: details,
            verification_method: kind.to_string(),
            verification_number: number.to_string(),
        }
    }

    fn upi(id: &str) -> MethodDetailsInput {
        MethodDetailsInput {
            upi_id: Some(id.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_upi_with_pan() {
        let validated = collect_withdrawal(&input("upi", upi("abc@xyz"), "pan", "abcde1234f")).unwrap();
        assert_eq!(
            validated.details,
            WithdrawalDetails::Upi {
                upi_id: "abc@xyz".to_string()
            }
        );
        assert_eq!(validated.verification.verification_number, "ABCDE1234F");
    }

    #[test]
    fn rejects_bad_upi_id_with_form_message() {
        let errors = collect_withdrawal(&input("upi", upi("abc"), "pan", "ABCDE1234F")).unwrap_err();
        assert_eq!(errors.get("upiId"), Some("Please enter a valid UPI ID"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn wallet_methods_need_ten_digit_phone() {
        let details = MethodDetailsInput {
            phone_number: Some("98765".to_string()),
            ..Default::default()
        };
        let errors = collect_withdrawal(&input("paytm", details, "aadhaar", "1234 5678 9012")).unwrap_err();
        assert_eq!(errors.get("phoneNumber"), Some("Please enter a valid 10-digit number"));

        let details = MethodDetailsInput {
            phone_number: Some("9876543210".to_string()),
            ..Default::default()
        };
        let validated = collect_withdrawal(&input("gpay", details, "aadhaar", "1234 5678 9012")).unwrap();
        assert_eq!(validated.details.method(), WithdrawalMethod::Gpay);
        assert_eq!(validated.verification.verification_number, "123456789012");
    }

    #[test]
    fn bank_reports_every_missing_field() {
        let details = MethodDetailsInput {
            ifsc_code: Some("SBIN123".to_string()),
            ..Default::default()
        };
        let errors = collect_withdrawal(&input("bank", details, "aadhaar", "1234")).unwrap_err();

        assert_eq!(errors.get("accountNumber"), Some("Account number is required"));
        assert_eq!(errors.get("ifscCode"), Some("Please enter a valid IFSC code"));
        assert_eq!(errors.get("accountName"), Some("Account holder name is required"));
        assert_eq!(errors.get("bankName"), Some("Bank name is required"));
        assert_eq!(errors.get("verificationNumber"), Some("Aadhaar number must be 12 digits"));
    }

    #[test]
    fn accepts_complete_bank_details() {
        let details = MethodDetailsInput {
            account_number: Some("0011 2233 4455".to_string()),
            ifsc_code: Some("sbin0000123".to_string()),
            account_name: Some("Asha  Rao".to_string()),
            bank_name: Some("State Bank of India".to_string()),
            ..Default::default()
        };
        let validated = collect_withdrawal(&input("bank", details, "pan", "ABCDE1234F")).unwrap();

        assert_eq!(
            validated.details,
            WithdrawalDetails::Bank {
                account_number: "001122334455".to_string(),
                ifsc_code: "SBIN0000123".to_string(),
                account_name: "Asha Rao".to_string(),
                bank_name: "State Bank of India".to_string(),
            }
        );
    }

    #[test]
    fn unknown_method_and_type_are_field_errors() {
        let errors =
            collect_withdrawal(&input("neft", MethodDetailsInput::default(), "passport", "X")).unwrap_err();
        assert!(errors.get("withdrawalMethod").is_some());
        assert!(errors.get("verificationMethod").is_some());
    }

    #[test]
    fn accepts_legacy_phone_field_names() {
        let input: WithdrawalInput = serde_json::from_value(serde_json::json!({
            "withdrawalMethod": "phonepe",
            "methodDetails": { "phonepeNumber": "9876543210" },
            "verificationMethod": "pan",
            "verificationNumber": "ABCDE1234F"
        }))
        .unwrap();

        assert!(collect_withdrawal(&input).is_ok());
    }
}
