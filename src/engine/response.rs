//! Reply text for the dialogue engine.

use crate::error::GatewayError;
use crate::normalize::Rejection;
use crate::schema::{Schema, Variable};
use crate::session::SessionState;

/// Missing names listed in a status line before collapsing to a count.
const STATUS_MISSING_PREVIEW: usize = 3;

pub fn greeting(schema: &Schema) -> String {
    let listing: Vec<String> = schema.names().map(|name| format!("• {}", name)).collect();
    format!(
        "**Welcome to the Freelance Bid Prediction Chatbot!**\n\n\
         I'll help you predict freelance bid outcomes by collecting information about your project.\n\n\
         **Required Variables ({} total):**\n{}\n\n\
         Let's start! {}",
        schema.len(),
        listing.join("\n"),
        prompt(&schema.first().name)
    )
}

pub fn prompt(variable: &str) -> String {
    format!("Please enter a value for **{}**:", variable)
}

pub fn all_filled_hint() -> String {
    "All variables are filled! Type 'predict' to run the model or 'status' to see current values."
        .to_string()
}

pub fn all_filled_menu() -> String {
    "All variables are filled! Type 'predict' to run the model, 'status' to see values, or 'reset' to start over."
        .to_string()
}

pub fn not_understood(next: &str) -> String {
    format!("Sorry, I didn't catch that. {}", prompt(next))
}

pub fn status(schema: &Schema, state: &SessionState) -> String {
    let missing = schema.missing(&state.inputs);
    let mut text = format!(
        "Progress: {}/{} variables filled.",
        schema.filled_count(&state.inputs),
        schema.len()
    );
    if !missing.is_empty() {
        let shown = &missing[..missing.len().min(STATUS_MISSING_PREVIEW)];
        text.push_str(&format!(" Still need: {}", shown.join(", ")));
        if missing.len() > STATUS_MISSING_PREVIEW {
            text.push_str(&format!(" and {} more.", missing.len() - STATUS_MISSING_PREVIEW));
        }
    }

    text.push_str("\n\nCurrent values:");
    for (name, value) in state.ordered_values(schema) {
        text.push_str(&format!("\n• {}: {}", name, value));
    }
    text
}

pub fn reset(schema: &Schema) -> String {
    format!("Session reset! Let's start fresh.\n\n{}", greeting(schema))
}

pub fn rejected(variable: &Variable, rejection: &Rejection) -> String {
    format!(
        "{}\n{}\n\nPlease try again. {}",
        variable.warning_message(),
        rejection,
        prompt(&variable.name)
    )
}

pub fn acknowledged(variable: &str, value: &impl std::fmt::Display) -> String {
    format!("Got it! **{}** = {}", variable, value)
}

pub fn missing_for_prediction(missing: &[&str], suggestion: &str) -> String {
    format!(
        "Missing {} variables: {}\n\n{}\n\nPlease fill all variables for accurate prediction.",
        missing.len(),
        missing.join(", "),
        suggestion
    )
}

pub fn prediction_result(prediction: f64, first: &str) -> String {
    format!(
        "**Prediction Result:** {:.2}\n\nAll variables collected successfully! \
         Starting a new estimate. {}",
        prediction,
        prompt(first)
    )
}

pub fn prediction_failed(error: &GatewayError) -> String {
    format!("Prediction failed: {}", error)
}

pub fn apology() -> String {
    "Sorry, something went wrong while handling your message. Please try again.".to_string()
}
