//! Typed slot values
//!
//! A value keeps the integer/float distinction it was normalized with; the
//! untagged serde representation maps that onto JSON numbers with or without
//! a fractional part so the distinction survives persistence.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A collected, validated value for one schema variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    Integer(i64),
    Float(f64),
    Category(String),
}

impl SlotValue {
    /// Build the numeric variant for `num`: integral values become `Integer`.
    pub fn from_number(num: f64) -> Self {
        if num.fract() == 0.0 && num.abs() < i64::MAX as f64 {
            SlotValue::Integer(num as i64)
        } else {
            SlotValue::Float(num)
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SlotValue::Integer(i) => Some(*i as f64),
            SlotValue::Float(f) => Some(*f),
            SlotValue::Category(_) => None,
        }
    }
}

impl fmt::Display for SlotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotValue::Integer(i) => write!(f, "{}", i),
            // Debug keeps the trailing ".0" so floats never render as integers
            SlotValue::Float(x) => write!(f, "{:?}", x),
            SlotValue::Category(s) => f.write_str(s),
        }
    }
}
