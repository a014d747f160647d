//! Interrupting commands recognised before any variable handling.

const STATUS_PHRASES: &[&str] = &[
    "status",
    "show status",
    "what's filled",
    "what is filled",
    "progress",
];
const RESET_PHRASES: &[&str] = &["reset", "start over", "clear", "restart"];
const PREDICT_PHRASES: &[&str] = &["predict", "run prediction", "run model", "predict anyway"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Status,
    Reset,
    Predict,
}

impl Command {
    /// Exact, case-insensitive match on the trimmed utterance.
    pub fn parse(utterance: &str) -> Option<Self> {
        let lowered = utterance.trim().to_lowercase();
        let is = |phrases: &[&str]| phrases.contains(&lowered.as_str());

        if is(STATUS_PHRASES) {
            Some(Command::Status)
        } else if is(RESET_PHRASES) {
            Some(Command::Reset)
        } else if is(PREDICT_PHRASES) {
            Some(Command::Predict)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Status => "status",
            Command::Reset => "reset",
            Command::Predict => "predict",
        }
    }
}
