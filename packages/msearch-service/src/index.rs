use time::OffsetDateTime;

use msearch_domain::{Page, criteria::SearchCriteria};
use msearch_storage::{
	Result,
	db::Db,
	memory::MemoryIndex,
	models::SearchPage,
	queries,
	search::{self, SearchOptions},
};

use crate::BoxFuture;

/// Read side of the search index. Implemented by Postgres and by [`MemoryIndex`].
pub trait SearchIndex
where
	Self: Send + Sync,
{
	fn site_microcosm_ids<'a>(&'a self, site_id: i64) -> BoxFuture<'a, Result<Vec<i64>>>;

	fn ignored_microcosm_ids<'a>(&'a self, profile_id: i64) -> BoxFuture<'a, Result<Vec<i64>>>;

	fn cached_permissions<'a>(
		&'a self,
		site_id: i64,
		profile_id: i64,
		microcosm_ids: &'a [i64],
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Vec<(i64, bool)>>>;

	fn full_text<'a>(
		&'a self,
		criteria: &'a SearchCriteria,
		page: Page,
	) -> BoxFuture<'a, Result<SearchPage>>;

	fn metadata<'a>(
		&'a self,
		criteria: &'a SearchCriteria,
		page: Page,
	) -> BoxFuture<'a, Result<SearchPage>>;

	fn profiles_by_email<'a>(
		&'a self,
		site_id: i64,
		email: &'a str,
		page: Page,
	) -> BoxFuture<'a, Result<SearchPage>>;
}

pub struct PgIndex {
	pub db: Db,
	pub options: SearchOptions,
}
impl PgIndex {
	pub fn new(db: Db, options: SearchOptions) -> Self {
		Self { db, options }
	}
}

impl SearchIndex for PgIndex {
	fn site_microcosm_ids<'a>(&'a self, site_id: i64) -> BoxFuture<'a, Result<Vec<i64>>> {
		Box::pin(queries::site_microcosm_ids(&self.db, site_id))
	}

	fn ignored_microcosm_ids<'a>(&'a self, profile_id: i64) -> BoxFuture<'a, Result<Vec<i64>>> {
		Box::pin(queries::ignored_microcosm_ids(&self.db, profile_id))
	}

	fn cached_permissions<'a>(
		&'a self,
		site_id: i64,
		profile_id: i64,
		microcosm_ids: &'a [i64],
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Vec<(i64, bool)>>> {
		Box::pin(queries::cached_permissions(&self.db, site_id, profile_id, microcosm_ids, now))
	}

	fn full_text<'a>(
		&'a self,
		criteria: &'a SearchCriteria,
		page: Page,
	) -> BoxFuture<'a, Result<SearchPage>> {
		Box::pin(search::full_text(&self.db, criteria, page, &self.options))
	}

	fn metadata<'a>(
		&'a self,
		criteria: &'a SearchCriteria,
		page: Page,
	) -> BoxFuture<'a, Result<SearchPage>> {
		Box::pin(search::metadata(&self.db, criteria, page, &self.options))
	}

	fn profiles_by_email<'a>(
		&'a self,
		site_id: i64,
		email: &'a str,
		page: Page,
	) -> BoxFuture<'a, Result<SearchPage>> {
		Box::pin(queries::profiles_by_email(&self.db, site_id, email, page))
	}
}

impl SearchIndex for MemoryIndex {
	fn site_microcosm_ids<'a>(&'a self, site_id: i64) -> BoxFuture<'a, Result<Vec<i64>>> {
		Box::pin(async move { Ok(MemoryIndex::site_microcosm_ids(self, site_id)) })
	}

	fn ignored_microcosm_ids<'a>(&'a self, profile_id: i64) -> BoxFuture<'a, Result<Vec<i64>>> {
		Box::pin(async move { Ok(MemoryIndex::ignored_microcosm_ids(self, profile_id)) })
	}

	fn cached_permissions<'a>(
		&'a self,
		site_id: i64,
		profile_id: i64,
		microcosm_ids: &'a [i64],
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Vec<(i64, bool)>>> {
		Box::pin(async move {
			Ok(MemoryIndex::cached_permissions(self, site_id, profile_id, microcosm_ids, now))
		})
	}

	fn full_text<'a>(
		&'a self,
		criteria: &'a SearchCriteria,
		page: Page,
	) -> BoxFuture<'a, Result<SearchPage>> {
		Box::pin(async move { Ok(MemoryIndex::full_text(self, criteria, page)) })
	}

	fn metadata<'a>(
		&'a self,
		criteria: &'a SearchCriteria,
		page: Page,
	) -> BoxFuture<'a, Result<SearchPage>> {
		Box::pin(async move { Ok(MemoryIndex::metadata(self, criteria, page)) })
	}

	fn profiles_by_email<'a>(
		&'a self,
		site_id: i64,
		email: &'a str,
		page: Page,
	) -> BoxFuture<'a, Result<SearchPage>> {
		Box::pin(async move { Ok(MemoryIndex::profiles_by_email(self, site_id, email, page)) })
	}
}
