//! Variable Schema
//!
//! The ordered list of variables the bid model needs. Order matters: it drives
//! the "next missing" traversal and the greeting listing.
//!
//! A schema is resolved once at startup, either from configuration
//! (`VariableDef` entries) or from the built-in default list, and is shared
//! read-only afterwards.

mod value;

pub use value::SlotValue;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ============================================================================
// Variable definitions
// ============================================================================

/// Expected value type of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Numeric,
    Categorical,
}

/// Range/shape constraint applied to numeric values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Validator {
    NonNegative,
    Integer,
    Range { min: f64, max: f64 },
}

/// One named slot in the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub kind: VariableKind,
    /// Canonical options, in declaration order (categorical only)
    pub allowed_values: Vec<String>,
    pub validators: Vec<Validator>,
    /// Shown when a value for this variable is rejected
    pub warning: Option<String>,
}

impl Variable {
    pub fn numeric(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: VariableKind::Numeric,
            allowed_values: Vec::new(),
            validators: Vec::new(),
            warning: None,
        }
    }

    pub fn categorical(name: &str, allowed: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind: VariableKind::Categorical,
            allowed_values: allowed.iter().map(|s| s.to_string()).collect(),
            validators: Vec::new(),
            warning: None,
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_warning(mut self, warning: &str) -> Self {
        self.warning = Some(warning.to_string());
        self
    }

    /// Warning shown on invalid input, falling back to a generic message.
    pub fn warning_message(&self) -> String {
        self.warning
            .clone()
            .unwrap_or_else(|| format!("Invalid input for {}.", self.name))
    }
}

/// Configuration form of a variable (YAML).
///
/// ```yaml
/// - name: Freelancer_Success_Rate
///   kind: numeric
///   min: 0
///   max: 100
/// - name: Urgency
///   kind: categorical
///   allowed_values: [Low, Normal, High]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDef {
    pub name: String,
    pub kind: VariableKind,
    #[serde(default)]
    pub allowed_values: Vec<String>,
    #[serde(default)]
    pub non_negative: bool,
    #[serde(default)]
    pub integer: bool,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub warning: Option<String>,
}

impl VariableDef {
    fn into_variable(self) -> Result<Variable, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidVariable {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }

        let has_numeric_rules =
            self.non_negative || self.integer || self.min.is_some() || self.max.is_some();

        let mut validators = Vec::new();
        match self.kind {
            VariableKind::Categorical => {
                if has_numeric_rules {
                    return Err(invalid("categorical variables cannot carry numeric rules"));
                }
                if self.allowed_values.iter().any(|v| v.trim().is_empty()) {
                    return Err(invalid("allowed values must not be empty strings"));
                }
            }
            VariableKind::Numeric => {
                if !self.allowed_values.is_empty() {
                    return Err(invalid("numeric variables cannot declare allowed values"));
                }
                match (self.min, self.max) {
                    (Some(min), Some(max)) if min > max => {
                        return Err(invalid("min must not exceed max"));
                    }
                    (min, max) if min.is_some() || max.is_some() => {
                        validators.push(Validator::Range {
                            min: min.unwrap_or(f64::NEG_INFINITY),
                            max: max.unwrap_or(f64::INFINITY),
                        });
                    }
                    _ => {}
                }
                if self.non_negative {
                    validators.push(Validator::NonNegative);
                }
                if self.integer {
                    validators.push(Validator::Integer);
                }
            }
        }

        Ok(Variable {
            name: self.name,
            kind: self.kind,
            allowed_values: self.allowed_values,
            validators,
            warning: self.warning,
        })
    }
}

// ============================================================================
// Schema
// ============================================================================

/// Ordered, immutable set of variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    variables: Vec<Variable>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::default_bid_schema()
    }
}

impl Schema {
    /// Build a schema, rejecting empty or duplicate definitions.
    pub fn new(variables: Vec<Variable>) -> Result<Self, ConfigError> {
        if variables.is_empty() {
            return Err(ConfigError::EmptySchema);
        }
        let mut seen = HashSet::new();
        for var in &variables {
            if !seen.insert(var.name.as_str()) {
                return Err(ConfigError::DuplicateVariable {
                    name: var.name.clone(),
                });
            }
        }
        Ok(Self { variables })
    }

    /// Build from configuration entries.
    pub fn from_definitions(defs: Vec<VariableDef>) -> Result<Self, ConfigError> {
        let variables = defs
            .into_iter()
            .map(VariableDef::into_variable)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(variables)
    }

    /// The freelance bid variables used when no schema is configured.
    pub fn default_bid_schema() -> Self {
        use Validator::*;

        let variables = vec![
            Variable::numeric("Client_Budget_Min")
                .with_validator(NonNegative)
                .with_warning("The minimum budget value seems invalid. Please enter a positive numeric value."),
            Variable::numeric("Client_Budget_Max")
                .with_validator(NonNegative)
                .with_warning("The maximum budget value seems invalid. Please enter a positive numeric value greater than minimum budget."),
            Variable::categorical(
                "Skills_Required",
                &["Web Dev", "Data Science", "Graphic Design", "Writing", "Mobile Dev", "Marketing", "Other"],
            )
            .with_warning("Invalid skill category. Please choose from: Web Dev, Data Science, Graphic Design, Writing, Mobile Dev, Marketing, or Other."),
            Variable::numeric("Avg_Past_Bids")
                .with_validator(NonNegative)
                .with_warning("The average past bids value seems out of range. Please enter a positive numeric value."),
            Variable::categorical("Location", &["USA", "India", "Europe", "Other"])
                .with_warning("Invalid location. Please choose from: USA, India, Europe, or Other."),
            Variable::categorical("Client_History", &["New", "Repeat"])
                .with_warning("Invalid client history. Please choose: New or Repeat."),
            Variable::numeric("Freelancer_Success_Rate")
                .with_validator(Range { min: 0.0, max: 100.0 })
                .with_warning("Success rate should be between 0 and 100. Please enter a valid percentage."),
            Variable::numeric("Duration_Days")
                .with_validator(NonNegative)
                .with_warning("Duration should be a positive number of days. Please enter a valid value."),
            Variable::categorical("Urgency", &["Low", "Normal", "High"])
                .with_warning("Invalid urgency level. Please choose: Low, Normal, or High."),
            Variable::numeric("Freelancer_Exp_Years")
                .with_validator(NonNegative)
                .with_warning("Experience years should be a positive number. Please enter a valid value."),
            Variable::categorical("Complexity", &["Low", "Medium", "High"])
                .with_warning("Invalid complexity level. Please choose: Low, Medium, or High."),
            Variable::numeric("Num_Bidders")
                .with_validator(NonNegative)
                .with_validator(Integer)
                .with_warning("Number of bidders should be a positive integer. Please enter a valid value."),
        ];

        Self { variables }
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.name.as_str())
    }

    /// First variable in traversal order.
    pub fn first(&self) -> &Variable {
        &self.variables[0]
    }

    /// Next variable without a value, in schema order.
    pub fn next_missing(&self, inputs: &HashMap<String, SlotValue>) -> Option<&Variable> {
        self.variables
            .iter()
            .find(|v| !inputs.contains_key(&v.name))
    }

    /// All unset variable names, in schema order.
    pub fn missing(&self, inputs: &HashMap<String, SlotValue>) -> Vec<&str> {
        self.names()
            .filter(|name| !inputs.contains_key(*name))
            .collect()
    }

    pub fn filled_count(&self, inputs: &HashMap<String, SlotValue>) -> usize {
        self.names().filter(|name| inputs.contains_key(*name)).count()
    }

    pub fn is_complete(&self, inputs: &HashMap<String, SlotValue>) -> bool {
        self.next_missing(inputs).is_none()
    }
}
