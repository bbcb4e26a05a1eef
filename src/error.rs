use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("sheets request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sheets api returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("service account auth failed: {0}")]
    Auth(String),

    #[error("failed to generate a unique referral code after {0} attempts")]
    CodeGenerationExhausted(usize),

    #[error("referrer with code {0} not found")]
    ReferrerNotFound(String),

    #[error("referrer with id {0} not found")]
    ReferrerIdNotFound(i64),

    #[error("user {0} is already bound to a referral code")]
    AlreadyInvited(i64),

    #[error("a referral code cannot be applied to its own owner")]
    SelfReferral,

    #[error("invalid wallet address format")]
    InvalidWallet,

    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Validation errors get a specific corrective message; everything else
    /// is an internal condition the user can only retry.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::InvalidWallet
                | AppError::SelfReferral
                | AppError::AlreadyInvited(_)
                | AppError::ReferrerNotFound(_)
        )
    }

    pub fn user_message(&self) -> String {
        match self {
            AppError::InvalidWallet => {
                "Invalid wallet address. Use the UQ... or EQ... format (48 characters).".to_string()
            }
            AppError::SelfReferral => "You cannot use your own referral link.".to_string(),
            AppError::AlreadyInvited(_) => {
                "You are already part of the referral program.".to_string()
            }
            AppError::ReferrerNotFound(_) => "Unknown referral code.".to_string(),
            _ => "Something went wrong. Please try again later.".to_string(),
        }
    }
}
