use std::time::Instant;

use msearch_domain::Page;

use crate::{
	Error, Result, SearchService,
	search::{QueryEcho, ResultsPage, SearchResponse},
};

#[derive(Debug, Clone, Default)]
pub struct ProfileSearchRequest {
	pub site_id: i64,
	pub viewer_id: i64,
	pub email: String,
	pub limit: Option<i64>,
	pub offset: Option<i64>,
}

impl SearchService {
	/// Profiles on a site registered with an email address, for administrators.
	pub async fn search_profiles(&self, req: ProfileSearchRequest) -> Result<SearchResponse> {
		let started = Instant::now();
		let email = req.email.trim();

		if email.is_empty() {
			return Err(Error::InvalidRequest { message: "email must be non-empty.".to_string() });
		}

		let page = Page::resolve(req.limit, req.offset, self.page_limits())?;
		let found = self.index.profiles_by_email(req.site_id, email, page).await?;

		page.check_offset(found.total)?;

		let total = found.total;
		let result = crate::hydrate::hydrate(
			&self.providers.summaries,
			req.site_id,
			req.viewer_id,
			found.hits,
		)
		.await?;
		let echo = QueryEcho {
			q: email.to_string(),
			searched: email.to_string(),
			valid: true,
			..QueryEcho::default()
		};
		let results = ResultsPage {
			total,
			limit: page.limit,
			offset: page.offset,
			pages: page.page_count(total),
			result,
		};

		tracing::info!(site_id = req.site_id, total, "Profile email lookup completed.");

		Ok(SearchResponse::finish(echo, started, results))
	}
}
