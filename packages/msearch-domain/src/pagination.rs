use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
	pub default_limit: i64,
	pub max_limit: i64,
}
impl Default for PageLimits {
	fn default() -> Self {
		Self { default_limit: 25, max_limit: 100 }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
	pub limit: i64,
	pub offset: i64,
}
impl Page {
	pub fn resolve(limit: Option<i64>, offset: Option<i64>, limits: PageLimits) -> Result<Self> {
		let limit = limit.unwrap_or(limits.default_limit);
		let offset = offset.unwrap_or(0);

		if limit < 1 || limit > limits.max_limit {
			return Err(Error::Pagination {
				message: format!("limit must be between 1 and {}.", limits.max_limit),
			});
		}
		if offset < 0 {
			return Err(Error::Pagination {
				message: "offset must be zero or greater.".to_string(),
			});
		}

		Ok(Self { limit, offset })
	}

	pub fn page_count(&self, total: i64) -> i64 {
		if total <= 0 { 0 } else { (total + self.limit - 1) / self.limit }
	}

	/// Fails when the offset points past the last row. Offset zero is always accepted.
	pub fn check_offset(&self, total: i64) -> Result<()> {
		let max_offset = max_offset(total);

		if self.offset > max_offset {
			return Err(Error::OffsetOutOfRange { offset: self.offset, max_offset });
		}

		Ok(())
	}
}

/// Greatest offset that still returns a row, or zero for an empty result.
pub fn max_offset(total: i64) -> i64 {
	(total - 1).max(0)
}
