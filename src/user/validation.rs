//! Custom field validators.

use std::sync::LazyLock;

use regex_lite::Regex;
use validator::ValidationError;

const CPF_LENGTH: usize = 11;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(([^<>()\[\]\\.,;:\s@"]+(\.[^<>()\[\]\\.,;:\s@"]+)*)|(".+"))@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}))$"#,
    )
    .unwrap()
});

/// Check email shape.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if !EMAIL_RE.is_match(email) {
        let mut err = ValidationError::new("email")
            .with_message("Email must be formatted.".into());
        err.add_param("value".into(), &email);
        return Err(err);
    }

    Ok(())
}

/// Check a CPF (brazilian tax id) against its two check digits.
///
/// Punctuation (`.`, `-`) and spaces are ignored.
pub fn validate_tax_id(tax_id: &str) -> Result<(), ValidationError> {
    if !is_valid_cpf(tax_id) {
        let mut err = ValidationError::new("cpf")
            .with_message(format!("taxId: Invalid CPF ({tax_id})").into());
        err.add_param("value".into(), &tax_id);
        return Err(err);
    }

    Ok(())
}

/// Raw CPF checksum.
pub fn is_valid_cpf(value: &str) -> bool {
    let mut digits = Vec::with_capacity(CPF_LENGTH);
    for c in value.chars() {
        match c {
            '0'..='9' => digits.push(c as u32 - '0' as u32),
            '.' | '-' | ' ' => continue,
            _ => return false,
        }
    }

    if digits.len() != CPF_LENGTH {
        return false;
    }

    // 000.000.000-00, 111.111.111-11... pass the checksum but are invalid.
    if digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    check_digit(&digits[..9]) == digits[9]
        && check_digit(&digits[..10]) == digits[10]
}

fn check_digit(digits: &[u32]) -> u32 {
    let weight = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (weight - i as u32))
        .sum();

    match (sum * 10) % 11 {
        10 => 0,
        rest => rest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_valid_cpf() {
        for cpf in ["529.982.247-25", "52998224725", "111.444.777-35", "390.533.447-05"] {
            assert!(is_valid_cpf(cpf), "{cpf} should be valid");
            assert!(validate_tax_id(cpf).is_ok());
        }
    }

    #[test]
    fn test_invalid_cpf() {
        for cpf in [
            "529.982.247-26",
            "52998224724",
            "111.111.111-11",
            "00000000000",
            "5299822472",
            "529982247255",
            "529.982.247-2a",
            "",
        ] {
            assert!(!is_valid_cpf(cpf), "{cpf} should be invalid");
        }
    }

    #[test]
    fn test_tax_id_message_contains_value() {
        let err = validate_tax_id("123.456.789-00").unwrap_err();

        assert_eq!(err.code, "cpf");
        assert_eq!(
            err.message.as_deref(),
            Some("taxId: Invalid CPF (123.456.789-00)")
        );
    }

    #[test]
    fn test_email() {
        for email in [
            "x@example.com",
            "first.last@sub.example.com.br",
            "user+tag@example.io",
            "\"quoted name\"@example.com",
            "root@[192.168.0.1]",
        ] {
            assert!(validate_email(email).is_ok(), "{email} should be valid");
        }

        for email in [
            "plainaddress",
            "@example.com",
            "x@example",
            "x@example.c",
            "x y@example.com",
            "x@@example.com",
            "x.@example.com",
        ] {
            assert!(validate_email(email).is_err(), "{email} should be invalid");
        }
    }

    fn with_check_digits(base: &[u32]) -> Vec<u32> {
        let mut digits = base.to_vec();
        digits.push(check_digit(&digits[..9]));
        digits.push(check_digit(&digits[..10]));
        digits
    }

    fn render(digits: &[u32]) -> String {
        digits.iter().map(|d| char::from_digit(*d, 10).unwrap()).collect()
    }

    proptest! {
        #[test]
        fn prop_computed_check_digits_are_valid(
            base in prop::collection::vec(0u32..10, 9)
        ) {
            prop_assume!(base.iter().any(|d| *d != base[0]));
            let cpf = render(&with_check_digits(&base));

            prop_assert!(is_valid_cpf(&cpf), "{} should be valid", cpf);
            let formatted = format!(
                "{}.{}.{}-{}",
                &cpf[..3],
                &cpf[3..6],
                &cpf[6..9],
                &cpf[9..]
            );
            prop_assert!(is_valid_cpf(&formatted));
        }

        #[test]
        fn prop_wrong_check_digit_is_invalid(
            base in prop::collection::vec(0u32..10, 9),
            position in 9usize..11,
            shift in 1u32..10,
        ) {
            let mut digits = with_check_digits(&base);
            digits[position] = (digits[position] + shift) % 10;

            prop_assert!(!is_valid_cpf(&render(&digits)));
        }
    }
}
