//! Value Normalizer
//!
//! Turns a raw chat answer into a typed value for one schema variable:
//!
//! 1. **Filler stripping**: hedges ("maybe", "around", "i think") and unit
//!    noise ("years", "value") are removed as whole words
//! 2. **Numeric path**: first signed decimal in the text, thousands
//!    separators ignored, then the variable's validators
//! 3. **Categorical path**: exact option, then closest option by sequence
//!    similarity, then token containment, first hit wins
//!
//! Everything here is pure; rejections are values, not errors.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::schema::{SlotValue, Validator, Variable, VariableKind};

/// Minimum similarity for a fuzzy option match.
pub const FUZZY_CUTOFF: f32 = 0.6;

static FILLER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:maybe|around|approximately|approx|about|roughly|i think|i'm thinking|probably|not sure|kind of|kinda|value|years|yrs|yr)\b",
    )
    .unwrap()
});

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-?[0-9]+(?:\.[0-9]+)?").unwrap());

static NON_ALNUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9 ]+").unwrap());

// ============================================================================
// Rejections
// ============================================================================

/// Why a raw answer could not be accepted for a variable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("No input provided.")]
    NoInput,

    #[error("Could not extract numeric value.")]
    NoNumber,

    #[error("{}", range_message(.min, .max))]
    OutOfRange { min: f64, max: f64 },

    #[error("Value must be non-negative.")]
    Negative,

    #[error("Value must be a whole number.")]
    NotInteger,

    #[error("Value is too large.")]
    TooLarge,

    #[error("Invalid option. Expected one of: {}", join_options(.allowed))]
    UnknownOption { allowed: Vec<String> },
}

fn range_message(min: &f64, max: &f64) -> String {
    let (min, max) = (*min, *max);
    match (min.is_finite(), max.is_finite()) {
        (true, true) => format!("Value must be between {} and {}.", min, max),
        (true, false) => format!("Value must be at least {}.", min),
        (false, true) => format!("Value must be at most {}.", max),
        (false, false) => "Value is out of range.".to_string(),
    }
}

fn join_options(allowed: &[String]) -> String {
    allowed.join(", ")
}

// ============================================================================
// Entry point
// ============================================================================

/// Normalize `raw` against `variable`'s kind, options and validators.
pub fn normalize(raw: &str, variable: &Variable) -> Result<SlotValue, Rejection> {
    if raw.trim().is_empty() {
        return Err(Rejection::NoInput);
    }

    let stripped = strip_fillers(raw);
    match variable.kind {
        VariableKind::Numeric => normalize_numeric(&stripped, &variable.validators),
        VariableKind::Categorical => normalize_categorical(&stripped, &variable.allowed_values),
    }
}

/// Remove hedge and unit words, collapsing the whitespace they leave behind.
pub fn strip_fillers(raw: &str) -> String {
    let replaced = FILLER_RE.replace_all(raw.trim(), " ");
    collapse_whitespace(&replaced)
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// First signed decimal in `text`, with commas treated as thousands separators.
pub fn extract_number(text: &str) -> Option<f64> {
    let without_commas = text.replace(',', "");
    NUMBER_RE
        .find(&without_commas)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

// ============================================================================
// Numeric path
// ============================================================================

fn normalize_numeric(text: &str, validators: &[Validator]) -> Result<SlotValue, Rejection> {
    let num = extract_number(text).ok_or(Rejection::NoNumber)?;
    if !num.is_finite() {
        return Err(Rejection::TooLarge);
    }

    for validator in validators {
        match *validator {
            Validator::Range { min, max } if num < min || num > max => {
                return Err(Rejection::OutOfRange { min, max });
            }
            Validator::NonNegative if num < 0.0 => return Err(Rejection::Negative),
            Validator::Integer if num.fract() != 0.0 => return Err(Rejection::NotInteger),
            _ => {}
        }
    }

    Ok(SlotValue::from_number(num))
}

// ============================================================================
// Categorical path
// ============================================================================

fn normalize_categorical(text: &str, allowed: &[String]) -> Result<SlotValue, Rejection> {
    let cleaned = collapse_whitespace(&NON_ALNUM_RE.replace_all(text, " "));

    if allowed.is_empty() {
        if cleaned.is_empty() {
            return Err(Rejection::NoInput);
        }
        return Ok(SlotValue::Category(title_case(&cleaned)));
    }

    let lowered = cleaned.to_lowercase();
    let lower_options: Vec<String> = allowed.iter().map(|o| o.to_lowercase()).collect();

    // (a) exact, case-insensitive
    if let Some(idx) = lower_options.iter().position(|o| *o == lowered) {
        return Ok(SlotValue::Category(allowed[idx].clone()));
    }

    // (b) closest by similarity
    if let Some(best) = closest_option(&lowered, &lower_options) {
        if let Some(idx) = lower_options.iter().position(|o| o == best) {
            return Ok(SlotValue::Category(allowed[idx].clone()));
        }
    }

    // (c) any token contained in an option
    let tokens: Vec<&str> = lowered.split_whitespace().collect();
    if let Some(idx) = lower_options
        .iter()
        .position(|o| tokens.iter().any(|t| o.contains(t)))
    {
        return Ok(SlotValue::Category(allowed[idx].clone()));
    }

    Err(Rejection::UnknownOption {
        allowed: allowed.to_vec(),
    })
}

/// Option with the best sequence-similarity ratio, if it reaches the cutoff.
fn closest_option<'a>(word: &str, options: &'a [String]) -> Option<&'a str> {
    let candidates: Vec<&str> = options.iter().map(String::as_str).collect();
    similar::get_close_matches(word, &candidates, 1, FUZZY_CUTOFF)
        .into_iter()
        .next()
}

/// Uppercase every letter that follows a non-letter, lowercase the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_letter = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if prev_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(ch);
            prev_is_letter = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    fn var(name: &str) -> Variable {
        Schema::default_bid_schema().get(name).unwrap().clone()
    }

    #[test]
    fn test_filler_and_thousands_separator() {
        let result = normalize("around 1,200 dollars, maybe", &var("Client_Budget_Min"));
        assert_eq!(result, Ok(SlotValue::Integer(1200)));
    }

    #[test]
    fn test_strip_fillers_whole_words_only() {
        assert_eq!(strip_fillers("I think   about 5 yrs"), "5");
        assert_eq!(strip_fillers("Maybe aboutface"), "aboutface");
        assert_eq!(strip_fillers("i'm thinking 40"), "40");
    }

    #[test]
    fn test_float_kept_as_float() {
        assert_eq!(
            normalize("750.5", &var("Client_Budget_Max")),
            Ok(SlotValue::Float(750.5))
        );
    }

    #[test]
    fn test_no_number() {
        assert_eq!(
            normalize("bad value", &var("Client_Budget_Max")),
            Err(Rejection::NoNumber)
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize("   ", &var("Duration_Days")), Err(Rejection::NoInput));
        assert_eq!(normalize("", &var("Location")), Err(Rejection::NoInput));
    }

    #[test]
    fn test_success_rate_bounds() {
        let rate = var("Freelancer_Success_Rate");
        assert!(matches!(
            normalize("101", &rate),
            Err(Rejection::OutOfRange { .. })
        ));
        assert_eq!(normalize("100", &rate), Ok(SlotValue::Integer(100)));
        assert_eq!(normalize("0", &rate), Ok(SlotValue::Integer(0)));
        assert_eq!(
            normalize("101", &rate).unwrap_err().to_string(),
            "Value must be between 0 and 100."
        );
    }

    #[test]
    fn test_negative_budget_rejected() {
        assert_eq!(
            normalize("-5", &var("Client_Budget_Min")),
            Err(Rejection::Negative)
        );
    }

    #[test]
    fn test_bidders_must_be_whole() {
        let bidders = var("Num_Bidders");
        assert_eq!(normalize("2.5", &bidders), Err(Rejection::NotInteger));
        assert_eq!(normalize("-1", &bidders), Err(Rejection::Negative));
        assert_eq!(normalize("12 bidders", &bidders), Ok(SlotValue::Integer(12)));
    }

    #[test]
    fn test_unconstrained_numeric_accepts_negative() {
        let free = Variable::numeric("Delta");
        assert_eq!(normalize("-3.25", &free), Ok(SlotValue::Float(-3.25)));
    }

    #[test]
    fn test_categorical_exact_case_insensitive() {
        assert_eq!(
            normalize("  usa ", &var("Location")),
            Ok(SlotValue::Category("USA".into()))
        );
    }

    #[test]
    fn test_categorical_fuzzy() {
        assert_eq!(
            normalize("webdev", &var("Skills_Required")),
            Ok(SlotValue::Category("Web Dev".into()))
        );
        assert_eq!(
            normalize("Repeet", &var("Client_History")),
            Ok(SlotValue::Category("Repeat".into()))
        );
    }

    #[test]
    fn test_categorical_token_containment() {
        // under the fuzzy cutoff, but "science" is contained in an option
        assert_eq!(
            normalize("mostly science stuff", &var("Skills_Required")),
            Ok(SlotValue::Category("Data Science".into()))
        );
    }

    #[test]
    fn test_categorical_punctuation_stripped() {
        assert_eq!(
            normalize("high!!!", &var("Urgency")),
            Ok(SlotValue::Category("High".into()))
        );
    }

    #[test]
    fn test_categorical_no_match_lists_options() {
        let err = normalize("qqq", &var("Client_History")).unwrap_err();
        assert_eq!(
            err,
            Rejection::UnknownOption {
                allowed: vec!["New".into(), "Repeat".into()]
            }
        );
        assert_eq!(err.to_string(), "Invalid option. Expected one of: New, Repeat");
    }

    #[test]
    fn test_free_categorical_title_cased() {
        let free = Variable::categorical("Industry", &[]);
        assert_eq!(
            normalize("fin-tech startup", &free),
            Ok(SlotValue::Category("Fin Tech Startup".into()))
        );
        assert_eq!(
            normalize("3d printing", &free),
            Ok(SlotValue::Category("3D Printing".into()))
        );
    }

    #[test]
    fn test_huge_number_rejected() {
        let huge = format!("1{}", "0".repeat(400));
        assert_eq!(
            normalize(&huge, &var("Client_Budget_Min")),
            Err(Rejection::TooLarge)
        );
        assert_eq!(
            normalize(&huge, &Variable::numeric("Delta")),
            Err(Rejection::TooLarge)
        );
    }

    #[test]
    fn test_closest_option() {
        let opts: Vec<String> = ["web dev", "data science", "mobile dev"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(closest_option("webdev", &opts), Some("web dev"));
        assert_eq!(closest_option("mobil dev", &opts), Some("mobile dev"));
        assert_eq!(closest_option("zzz", &opts), None);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("hELLO wORLD"), "Hello World");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn with_separators(n: u64) -> String {
            let digits = n.to_string();
            let mut out = String::new();
            for (i, ch) in digits.chars().enumerate() {
                if i > 0 && (digits.len() - i) % 3 == 0 {
                    out.push(',');
                }
                out.push(ch);
            }
            out
        }

        proptest! {
            #[test]
            fn hedged_integers_extract_exactly(
                n in 0u64..10_000_000,
                prefix in prop::sample::select(vec!["", "maybe ", "around ", "roughly ", "i think "]),
                suffix in prop::sample::select(vec!["", " dollars", " maybe", ", probably"]),
            ) {
                let raw = format!("{}{}{}", prefix, with_separators(n), suffix);
                prop_assert_eq!(
                    normalize(&raw, &var("Client_Budget_Min")),
                    Ok(SlotValue::Integer(n as i64))
                );
            }

            #[test]
            fn allowed_values_match_in_any_case(idx in 0usize..7, upper in any::<bool>()) {
                let skills = var("Skills_Required");
                let option = skills.allowed_values[idx].clone();
                let raw = if upper { option.to_uppercase() } else { option.to_lowercase() };
                prop_assert_eq!(normalize(&raw, &skills), Ok(SlotValue::Category(option)));
            }
        }
    }
}
