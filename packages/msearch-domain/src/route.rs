use serde::Serialize;

use crate::query::Query;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
	FullText,
	Metadata,
}
impl Route {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::FullText => "full_text",
			Self::Metadata => "metadata",
		}
	}
}

pub fn route(query: &Query) -> Route {
	if query.has_free_text() { Route::FullText } else { Route::Metadata }
}
