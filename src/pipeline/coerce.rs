//! Type coercion for raw model answers.
//!
//! Grounding and typing are independent gates: a grounded answer that
//! fails coercion is retried, not nulled.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::types::record::FieldValue;
use crate::types::schema::ValueType;

/// A retry-worthy coercion failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoerceError {
    /// The raw answer that failed to parse.
    pub raw: String,

    /// The type it failed to parse as.
    pub expected: ValueType,
}

impl fmt::Display for CoerceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot coerce {:?} to {:?}", self.raw, self.expected)
    }
}

impl std::error::Error for CoerceError {}

fn number_noise() -> &'static Regex {
    static NOISE: OnceLock<Regex> = OnceLock::new();
    // thousands separators, currency symbols, surrounding whitespace
    NOISE.get_or_init(|| Regex::new(r"[,\s$€£]|(usd|mxn)").expect("static regex"))
}

/// Coerce a raw answer to the expected type.
///
/// - `String`: trimmed pass-through, never fails.
/// - `Number`: strips separators/currency, parses integer when no decimal
///   point is present, float otherwise.
/// - `Boolean`: true iff the answer contains a truthy keyword
///   (case-insensitive); never fails.
pub fn coerce(
    raw: &str,
    expected: ValueType,
    truthy_keywords: &[String],
) -> Result<FieldValue, CoerceError> {
    let trimmed = raw.trim();
    match expected {
        ValueType::String => Ok(FieldValue::Text(trimmed.to_string())),
        ValueType::Boolean => {
            let lowered = trimmed.to_lowercase();
            let truthy = truthy_keywords
                .iter()
                .any(|keyword| lowered.contains(&keyword.to_lowercase()));
            Ok(FieldValue::Bool(truthy))
        }
        ValueType::Number => {
            let lowered = trimmed.to_lowercase();
            let cleaned = number_noise().replace_all(&lowered, "");
            if cleaned.is_empty() {
                return Err(CoerceError {
                    raw: raw.to_string(),
                    expected,
                });
            }
            let err = || CoerceError {
                raw: raw.to_string(),
                expected,
            };
            if cleaned.contains('.') {
                cleaned.parse::<f64>().map(FieldValue::Float).map_err(|_| err())
            } else {
                cleaned.parse::<i64>().map(FieldValue::Integer).map_err(|_| err())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn truthy() -> Vec<String> {
        vec!["yes".into(), "true".into(), "stackable".into()]
    }

    #[test]
    fn test_number_strips_separators_and_currency() {
        assert_eq!(
            coerce("$3,500", ValueType::Number, &truthy()).unwrap(),
            FieldValue::Integer(3500)
        );
        assert_eq!(
            coerce("1,200.50 USD", ValueType::Number, &truthy()).unwrap(),
            FieldValue::Float(1200.50)
        );
        assert_eq!(
            coerce("470.0", ValueType::Number, &truthy()).unwrap(),
            FieldValue::Float(470.0)
        );
    }

    #[test]
    fn test_number_integer_without_decimal_point() {
        assert_eq!(
            coerce("12", ValueType::Number, &truthy()).unwrap(),
            FieldValue::Integer(12)
        );
        assert_eq!(
            coerce("-40", ValueType::Number, &truthy()).unwrap(),
            FieldValue::Integer(-40)
        );
    }

    #[test]
    fn test_number_rejects_prose() {
        assert!(coerce("about twelve", ValueType::Number, &truthy()).is_err());
        assert!(coerce("", ValueType::Number, &truthy()).is_err());
        assert!(coerce("12 pallets", ValueType::Number, &truthy()).is_err());
    }

    #[test]
    fn test_boolean_keyword_containment() {
        assert_eq!(
            coerce("Yes, it is", ValueType::Boolean, &truthy()).unwrap(),
            FieldValue::Bool(true)
        );
        assert_eq!(
            coerce("Stackable", ValueType::Boolean, &truthy()).unwrap(),
            FieldValue::Bool(true)
        );
        assert_eq!(
            coerce("no", ValueType::Boolean, &truthy()).unwrap(),
            FieldValue::Bool(false)
        );
        assert_eq!(
            coerce("not mentioned", ValueType::Boolean, &truthy()).unwrap(),
            FieldValue::Bool(false)
        );
    }

    #[test]
    fn test_string_trims() {
        assert_eq!(
            coerce("  Dallas  ", ValueType::String, &truthy()).unwrap(),
            FieldValue::Text("Dallas".to_string())
        );
    }

    proptest! {
        // coerce(coerce(x)) == coerce(x) for numeric-looking strings
        #[test]
        fn prop_number_coercion_is_idempotent(
            sign in proptest::bool::ANY,
            int_part in 0u64..10_000_000,
            frac in proptest::option::of(0u32..1000u32),
        ) {
            let mut raw = String::new();
            if sign {
                raw.push('-');
            }
            raw.push_str(&int_part.to_string());
            if let Some(frac) = frac {
                raw.push_str(&format!(".{frac:03}"));
            }

            let once = coerce(&raw, ValueType::Number, &[]).unwrap();
            let twice = coerce(&once.to_string(), ValueType::Number, &[]).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_decorated_numbers_parse(int_part in 1u64..1_000_000) {
            let raw = format!("${int_part}");
            let value = coerce(&raw, ValueType::Number, &[]).unwrap();
            prop_assert_eq!(value, FieldValue::Integer(int_part as i64));
        }
    }
}
