//! Linear bid model
//!
//! A small serializable model: intercept, one coefficient per numeric input
//! and an additive offset per categorical value. Loaded from YAML (JSON is
//! accepted too, being a YAML subset):
//!
//! ```yaml
//! intercept: 120.0
//! inputs: [Client_Budget_Min, Location]
//! coefficients:
//!   Client_Budget_Min: 0.08
//! category_offsets:
//!   Location:
//!     USA: 25.0
//!     India: -10.0
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::{BidModel, FeatureVector};
use crate::error::GatewayError;
use crate::schema::SlotValue;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinearBidModel {
    #[serde(default)]
    pub intercept: f64,

    /// Declared input order; every listed input must be supplied
    #[serde(default)]
    pub inputs: Option<Vec<String>>,

    #[serde(default)]
    pub coefficients: HashMap<String, f64>,

    /// Offsets keyed by feature, then by category (case-insensitive)
    #[serde(default)]
    pub category_offsets: HashMap<String, HashMap<String, f64>>,
}

impl LinearBidModel {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file: {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse model file: {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let model: Self = serde_yaml::from_str(content)?;
        Ok(model)
    }

    fn offset(&self, feature: &str, category: &str) -> f64 {
        self.category_offsets
            .get(feature)
            .and_then(|offsets| {
                offsets
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(category))
                    .map(|(_, offset)| *offset)
            })
            .unwrap_or(0.0)
    }
}

impl BidModel for LinearBidModel {
    fn input_names(&self) -> Option<&[String]> {
        self.inputs.as_deref()
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64, GatewayError> {
        if let Some(inputs) = &self.inputs {
            if let Some(missing) = inputs
                .iter()
                .find(|name| !features.iter().any(|(feature, _)| feature == *name))
            {
                return Err(GatewayError::Prediction(format!(
                    "missing input '{}'",
                    missing
                )));
            }
        }

        let mut total = self.intercept;
        for (feature, value) in features {
            match value {
                SlotValue::Category(category) => {
                    if self.coefficients.contains_key(feature) {
                        return Err(GatewayError::Prediction(format!(
                            "input '{}' expects a number, got '{}'",
                            feature, category
                        )));
                    }
                    total += self.offset(feature, category);
                }
                SlotValue::Integer(_) | SlotValue::Float(_) => {
                    let coefficient = self.coefficients.get(feature).copied().unwrap_or(0.0);
                    total += coefficient * value.as_f64().unwrap_or(0.0);
                }
            }
        }
        Ok(total)
    }
}
