pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid lexicon pattern: {0}")]
	Pattern(#[from] regex::Error),
	#[error("Invalid pagination: {message}")]
	Pagination { message: String },
	#[error("Offset {offset} is out of range; the last row is at offset {max_offset}.")]
	OffsetOutOfRange { offset: i64, max_offset: i64 },
}
