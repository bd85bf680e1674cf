use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /* mapped errors */
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),

    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error(transparent)]
    UrlError(#[from] url::ParseError),

    #[error(transparent)]
    SetLoggerError(#[from] log::SetLoggerError),

    /* lightdeck errors */
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Display error: {0}")]
    DisplayError(String),

    #[error("Service error: {0}")]
    ServiceError(String),
}

impl ApiError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn display_error(msg: impl Into<String>) -> Self {
        Self::DisplayError(msg.into())
    }

    pub fn service_error(msg: impl Into<String>) -> Self {
        Self::ServiceError(msg.into())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
