use crate::api::{validate::ValidationErrors, ApiError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

impl Error {
    /// Text for a snackbar or inline error
    pub fn user_message(&self) -> String {
        match self {
            Error::Api(e) => e.user_message(),
            Error::Validation(e) => e.to_string(),
        }
    }

    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(e) => Some(e),
            Error::Validation(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.api().map(|e| e.is_unauthorized()).unwrap_or(false)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
