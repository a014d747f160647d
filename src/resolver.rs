//! Variable Resolver
//!
//! Maps free text to the schema variable it talks about ("set the max budget
//! to 900" → `Client_Budget_Max`). Only identifies intent, never validates.
//!
//! Lookup order:
//! 1. Synonym phrases, in table order. The first phrase contained in the
//!    lowercased text wins, so table order decides ambiguous input
//! 2. Schema variable names, lowercased, in schema order

use tracing::warn;

use crate::schema::Schema;

/// Built-in phrases for the freelance bid variables, in precedence order.
const DEFAULT_SYNONYMS: &[(&str, &str)] = &[
    ("client_budget_min", "Client_Budget_Min"),
    ("client budget min", "Client_Budget_Min"),
    ("budget min", "Client_Budget_Min"),
    ("min budget", "Client_Budget_Min"),
    ("minimum budget", "Client_Budget_Min"),
    ("client_budget_max", "Client_Budget_Max"),
    ("client budget max", "Client_Budget_Max"),
    ("budget max", "Client_Budget_Max"),
    ("max budget", "Client_Budget_Max"),
    ("maximum budget", "Client_Budget_Max"),
    ("skills", "Skills_Required"),
    ("skills_required", "Skills_Required"),
    ("skill", "Skills_Required"),
    ("avg_past_bids", "Avg_Past_Bids"),
    ("average past bids", "Avg_Past_Bids"),
    ("avg past bids", "Avg_Past_Bids"),
    ("past bids", "Avg_Past_Bids"),
    ("location", "Location"),
    ("client_history", "Client_History"),
    ("client history", "Client_History"),
    ("history", "Client_History"),
    ("freelancer_success_rate", "Freelancer_Success_Rate"),
    ("success rate", "Freelancer_Success_Rate"),
    ("success", "Freelancer_Success_Rate"),
    ("duration", "Duration_Days"),
    ("duration_days", "Duration_Days"),
    ("days", "Duration_Days"),
    ("urgency", "Urgency"),
    ("freelancer_exp_years", "Freelancer_Exp_Years"),
    ("experience", "Freelancer_Exp_Years"),
    ("exp years", "Freelancer_Exp_Years"),
    ("years", "Freelancer_Exp_Years"),
    ("complexity", "Complexity"),
    ("num_bidders", "Num_Bidders"),
    ("bidders", "Num_Bidders"),
    ("number of bidders", "Num_Bidders"),
    ("bidders count", "Num_Bidders"),
];

/// Phrase table plus schema-name fallback.
#[derive(Debug, Clone)]
pub struct VariableResolver {
    /// (lowercased phrase, variable name)
    synonyms: Vec<(String, String)>,
    /// (lowercased name, variable name), schema order
    names: Vec<(String, String)>,
}

impl VariableResolver {
    /// Resolver using the built-in phrase table, restricted to `schema`.
    pub fn new(schema: &Schema) -> Self {
        let synonyms = DEFAULT_SYNONYMS
            .iter()
            .filter(|(_, variable)| schema.contains(variable))
            .map(|(phrase, variable)| (phrase.to_string(), variable.to_string()))
            .collect();
        let names = schema
            .names()
            .map(|name| (name.to_lowercase(), name.to_string()))
            .collect();
        Self { synonyms, names }
    }

    /// Resolver with no phrase table, only schema-name matching.
    pub fn names_only(schema: &Schema) -> Self {
        let mut resolver = Self::new(schema);
        resolver.synonyms.clear();
        resolver
    }

    /// Append extra phrases, checked after the existing ones.
    ///
    /// Phrases naming a variable outside `schema` are skipped.
    pub fn with_synonyms<I, P, V>(mut self, schema: &Schema, extra: I) -> Self
    where
        I: IntoIterator<Item = (P, V)>,
        P: AsRef<str>,
        V: Into<String>,
    {
        for (phrase, variable) in extra {
            let variable = variable.into();
            let phrase = phrase.as_ref().trim().to_lowercase();
            if phrase.is_empty() {
                continue;
            }
            if !schema.contains(&variable) {
                warn!(phrase = %phrase, variable = %variable, "Ignoring synonym for unknown variable");
                continue;
            }
            self.synonyms.push((phrase, variable));
        }
        self
    }

    /// The variable `text` explicitly mentions, if any.
    pub fn resolve(&self, text: &str) -> Option<&str> {
        if text.trim().is_empty() {
            return None;
        }
        let lowered = text.to_lowercase();

        self.synonyms
            .iter()
            .find(|(phrase, _)| lowered.contains(phrase.as_str()))
            .or_else(|| {
                self.names
                    .iter()
                    .find(|(name, _)| lowered.contains(name.as_str()))
            })
            .map(|(_, variable)| variable.as_str())
    }
}
