use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Element is detached from the document: {0}")]
    ElementDetached(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Backend error: {0}")]
    BackendError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
