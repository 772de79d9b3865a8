pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Offset {offset} is out of range; the last row is at offset {max_offset}.")]
	OffsetOutOfRange { offset: i64, max_offset: i64 },
	#[error("Too many results, narrow your search.")]
	SearchTimeout { timeout_ms: u64 },
	/// A hydration unit failed; `status` is the summary collaborator's.
	#[error("Summary request failed with status {status}: {message}")]
	Summary { status: u16, message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Internal error: {message}")]
	Internal { message: String },
}
impl From<msearch_storage::Error> for Error {
	fn from(err: msearch_storage::Error) -> Self {
		match err {
			msearch_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			msearch_storage::Error::Timeout { timeout_ms } => Self::SearchTimeout { timeout_ms },
			msearch_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
		}
	}
}

impl From<msearch_domain::Error> for Error {
	fn from(err: msearch_domain::Error) -> Self {
		match err {
			msearch_domain::Error::Pagination { message } => Self::InvalidRequest { message },
			msearch_domain::Error::OffsetOutOfRange { offset, max_offset } =>
				Self::OffsetOutOfRange { offset, max_offset },
			msearch_domain::Error::Pattern(inner) => Self::Internal { message: inner.to_string() },
		}
	}
}

impl From<msearch_providers::Error> for Error {
	fn from(err: msearch_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
