#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Batch cancelled after {processed} of {total} items")]
    Cancelled { processed: usize, total: usize },
}
