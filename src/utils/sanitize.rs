use serde_json::Value;

/// Masks identity numbers, payout destinations and credentials in JSON
/// payloads before they are logged.
pub fn sanitize_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sanitized = serde_json::Map::new();
            for (key, val) in map {
                let sanitized_val = if is_sensitive_field(key) {
                    mask_value(val)
                } else {
                    sanitize_json(val)
                };
                sanitized.insert(key.clone(), sanitized_val);
            }
            Value::Object(sanitized)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sanitize_json).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_field(key: &str) -> bool {
    let normalized: String = key
        .chars()
        .filter(|ch| *ch != '_' && *ch != '-')
        .flat_map(char::to_lowercase)
        .collect();

    matches!(
        normalized.as_str(),
        "verificationnumber"
            | "aadhaar"
            | "aadhaarnumber"
            | "pan"
            | "pannumber"
            | "accountnumber"
            | "upiid"
            | "phonenumber"
            | "phonepenumber"
            | "gpaynumber"
            | "paytmnumber"
            | "apikey"
            | "authorization"
            | "password"
            | "secret"
            | "signature"
    )
}

/// Keeps the last four characters of long strings.
fn mask_value(value: &Value) -> Value {
    match value {
        Value::String(s) if s.chars().count() > 8 => {
            let chars: Vec<char> = s.chars().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            Value::String(format!("****{}", tail))
        }
        _ => Value::String("****".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_identity_and_payout_fields() {
        let input = json!({
            "address": "0x1111111111111111111111111111111111111111",
            "verificationNumber": "1234 5678 9012",
            "methodDetails": {
                "upiId": "asha.rao@okaxis",
                "phonepeNumber": "9876543210",
                "account_number": "001122334455",
                "ifscCode": "SBIN0000123"
            },
            "amount": "10"
        });

        let sanitized = sanitize_json(&input);

        assert_eq!(sanitized["verificationNumber"], "****9012");
        assert_eq!(sanitized["methodDetails"]["upiId"], "****axis");
        assert_eq!(sanitized["methodDetails"]["phonepeNumber"], "****3210");
        assert_eq!(sanitized["methodDetails"]["account_number"], "****4455");
        assert_eq!(sanitized["methodDetails"]["ifscCode"], "SBIN0000123");
        assert_eq!(sanitized["amount"], "10");
        assert_eq!(sanitized["address"], input["address"]);
    }

    #[test]
    fn test_sanitize_short_and_non_string_values() {
        let input = json!({"pan": "ABC", "signature": {"r": 1}, "token": "WLD"});
        let sanitized = sanitize_json(&input);

        assert_eq!(sanitized["pan"], "****");
        assert_eq!(sanitized["signature"], "****");
        assert_eq!(sanitized["token"], "WLD");
    }

    #[test]
    fn test_sanitize_arrays() {
        let input = json!([{"upi_id": "someone@okhdfc"}]);
        assert_eq!(sanitize_json(&input)[0]["upi_id"], "****hdfc");
    }
}
