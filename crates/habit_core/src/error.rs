use thiserror::Error;

#[derive(Error, Debug)]
pub enum HabitError {
    #[error("unknown habit `{0}`")]
    UnknownHabit(String),

    #[error("invalid value for '{field}': {message}")]
    InvalidConfig { field: String, message: String },

    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HabitError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        HabitError::InvalidConfig {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = HabitError> = std::result::Result<T, E>;
