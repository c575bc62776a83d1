//! Error types shared by the store, access control and the two views.
//!
//! Views handle `AuthError` and `ValidationError` inline. `StoreError` is not
//! recovered from; it travels up as an `AppError` and fails the request.

use thiserror::Error;

/// Login failure. Unknown user and wrong password are not distinguished.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,
}

/// Rejection of an entry form before anything is written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Product name and dosage are required (missing: {0})")]
    MissingRequiredField(&'static str),

    #[error("Unknown station: {0}")]
    UnknownStation(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

/// Transport or authorization failure talking to the remote tabular store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Tabular store unavailable: {0}")]
    Unavailable(String),
}

#[cfg(feature = "web")]
impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

#[cfg(feature = "web")]
impl From<jsonwebtoken::errors::Error> for StoreError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        StoreError::Unavailable(format!("service account signing failed: {err}"))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX export failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Export produced invalid output: {0}")]
    Encoding(String),
}

/// Unified error for a single web interaction.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Template error: {0}")]
    Template(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(feature = "web")]
impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Store(_) => StatusCode::BAD_GATEWAY,
            AppError::Export(_) | AppError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            log::error!("request failed: {self}");
        }

        (status, crate::pages::error_page(status, &self.to_string())).into_response()
    }
}
