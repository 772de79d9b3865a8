#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error("Full-text search exceeded {timeout_ms} ms.")]
	Timeout { timeout_ms: u64 },
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
}
