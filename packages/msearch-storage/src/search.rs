use std::{
	future::Future,
	time::{Duration, Instant},
};

use sqlx::{Postgres, QueryBuilder};

use msearch_domain::{
	Page,
	criteria::{SearchCriteria, TextScope},
};

use crate::{
	Error, Result,
	db::Db,
	models::{HitRow, SearchPage},
	sql,
};

const QUERY_CANCELED_SQLSTATE: &str = "57014";

#[derive(Debug, Clone)]
pub struct SearchOptions {
	/// Postgres text search configuration, e.g. `english`.
	pub text_search_config: String,
	pub highlight_max_words: u32,
	pub full_text_timeout: Duration,
}
impl SearchOptions {
	pub fn from_config(cfg: &msearch_config::Search) -> Self {
		Self {
			text_search_config: cfg.text_search_config.clone(),
			highlight_max_words: cfg.highlight_max_words,
			full_text_timeout: Duration::from_millis(cfg.full_text_timeout_ms),
		}
	}

	fn headline_options(&self) -> String {
		let min_words = (self.highlight_max_words / 2).max(1);
		let max_words = self.highlight_max_words.max(min_words + 1);

		format!("MaxWords={max_words}, MinWords={min_words}")
	}

	fn timeout_ms(&self) -> u64 {
		u64::try_from(self.full_text_timeout.as_millis()).unwrap_or(u64::MAX).max(1)
	}
}

/// Ranked full-text search returning the page and the windowed total in one round trip.
///
/// The statement runs under `statement_timeout` and races a wall-clock timer. When the
/// timer wins, the backend running the statement is cancelled before the transaction is
/// released. The count fallback for a page past the end shares the same budget.
pub async fn full_text(
	db: &Db,
	criteria: &SearchCriteria,
	page: Page,
	options: &SearchOptions,
) -> Result<SearchPage> {
	if criteria.text.is_none() {
		return Err(Error::InvalidArgument(
			"Full-text search requires a text stage.".to_string(),
		));
	}

	let timeout_ms = options.timeout_ms();
	let started = Instant::now();
	let mut tx = db.pool.begin().await?;
	let backend_pid: i32 =
		sqlx::query_scalar("SELECT pg_backend_pid()").fetch_one(&mut *tx).await?;

	sqlx::query(&format!("SET LOCAL statement_timeout = {timeout_ms}")).execute(&mut *tx).await?;

	let mut builder = full_text_query(criteria, page, options);
	let fetch = builder.build_query_as::<HitRow>().fetch_all(&mut *tx);
	let rows = within_budget(db, backend_pid, options.full_text_timeout, timeout_ms, fetch).await?;
	let total = match rows.first() {
		Some(row) => row.total,
		None if page.offset > 0 => {
			let budget = options.full_text_timeout.saturating_sub(started.elapsed());
			let mut builder = count_query(criteria, options);
			let fetch = builder.build_query_scalar::<i64>().fetch_one(&mut *tx);

			within_budget(db, backend_pid, budget, timeout_ms, fetch).await?
		},
		None => 0,
	};

	tx.commit().await?;

	let hits: Vec<_> = rows.into_iter().filter_map(HitRow::into_hit).collect();

	tracing::debug!(
		total,
		hits = hits.len(),
		elapsed_ms = started.elapsed().as_millis() as u64,
		"Full-text page fetched."
	);

	Ok(SearchPage { total, hits })
}

/// Filter-only search: a count query followed by the page query.
pub async fn metadata(
	db: &Db,
	criteria: &SearchCriteria,
	page: Page,
	options: &SearchOptions,
) -> Result<SearchPage> {
	let total = count(db, criteria, options).await?;

	if total == 0 || page.offset >= total {
		return Ok(SearchPage { total, hits: Vec::new() });
	}

	let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
		"\
SELECT
	f.item_type_id,
	f.item_id,
	f.parent_item_type_id,
	f.parent_item_id,
	f.last_modified,
	1.0::float8 AS rank,
	'' AS highlight,
	",
	);

	sql::push_unread(&mut builder, criteria.viewer_id);
	builder.push(" AS has_unread,\n\t0::int8 AS total");
	sql::push_source(&mut builder, criteria, &options.text_search_config);
	sql::push_order(&mut builder, criteria.ordering());
	push_page(&mut builder, page);

	let rows = builder.build_query_as::<HitRow>().fetch_all(&db.pool).await?;
	let hits = rows.into_iter().filter_map(HitRow::into_hit).collect();

	Ok(SearchPage { total, hits })
}

pub async fn count(db: &Db, criteria: &SearchCriteria, options: &SearchOptions) -> Result<i64> {
	let mut builder = count_query(criteria, options);
	let total: i64 = builder.build_query_scalar().fetch_one(&db.pool).await?;

	Ok(total)
}

fn count_query<'a>(
	criteria: &SearchCriteria,
	options: &SearchOptions,
) -> QueryBuilder<'a, Postgres> {
	let mut builder: QueryBuilder<'a, Postgres> = QueryBuilder::new("SELECT COUNT(*)");

	sql::push_source(&mut builder, criteria, &options.text_search_config);

	builder
}

fn full_text_query<'a>(
	criteria: &SearchCriteria,
	page: Page,
	options: &SearchOptions,
) -> QueryBuilder<'a, Postgres> {
	let vector = match criteria.text.as_ref().map(|text| text.scope) {
		Some(TextScope::Title) => "si.title_vector",
		_ => "si.document_vector",
	};
	let mut builder: QueryBuilder<'a, Postgres> = QueryBuilder::new(format!(
		"\
SELECT
	f.item_type_id,
	f.item_id,
	f.parent_item_type_id,
	f.parent_item_id,
	f.last_modified,
	ts_rank_cd({vector}, tsq)::float8 AS rank,
	ts_headline("
	));

	builder.push_bind(options.text_search_config.clone());
	builder.push("::regconfig, si.document_text, tsq, ");
	builder.push_bind(options.headline_options());
	builder.push(") AS highlight,\n\t");
	sql::push_unread(&mut builder, criteria.viewer_id);
	builder.push(" AS has_unread,\n\tCOUNT(*) OVER () AS total");
	sql::push_source(&mut builder, criteria, &options.text_search_config);
	sql::push_order(&mut builder, criteria.ordering());
	push_page(&mut builder, page);

	builder
}

fn push_page(builder: &mut QueryBuilder<'_, Postgres>, page: Page) {
	builder.push("\nLIMIT ");
	builder.push_bind(page.limit);
	builder.push(" OFFSET ");
	builder.push_bind(page.offset);
}

fn is_query_canceled(err: &sqlx::Error) -> bool {
	match err {
		sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(QUERY_CANCELED_SQLSTATE),
		_ => false,
	}
}

/// Awaits a statement on the timed transaction. When the timer wins, the backend is
/// cancelled while the transaction still holds its connection.
async fn within_budget<T, F>(
	db: &Db,
	backend_pid: i32,
	budget: Duration,
	timeout_ms: u64,
	fetch: F,
) -> Result<T>
where
	F: Future<Output = Result<T, sqlx::Error>>,
{
	match tokio::time::timeout(budget, fetch).await {
		Ok(Ok(value)) => Ok(value),
		Ok(Err(err)) if is_query_canceled(&err) => {
			tracing::warn!(timeout_ms, "Full-text statement hit the statement timeout.");

			Err(Error::Timeout { timeout_ms })
		},
		Ok(Err(err)) => Err(err.into()),
		Err(_) => {
			cancel_backend(db, backend_pid).await;

			Err(Error::Timeout { timeout_ms })
		},
	}
}

async fn cancel_backend(db: &Db, backend_pid: i32) {
	let result = sqlx::query_scalar::<_, bool>("SELECT pg_cancel_backend($1)")
		.bind(backend_pid)
		.fetch_one(&db.pool)
		.await;

	match result {
		Ok(cancelled) => {
			tracing::warn!(backend_pid, cancelled, "Cancelled full-text statement after timeout.");
		},
		Err(err) => {
			tracing::warn!(
				backend_pid,
				error = %err,
				"Failed to cancel full-text statement after timeout."
			);
		},
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use crate::search::SearchOptions;

	#[test]
	fn headline_words_stay_ordered() {
		let options = SearchOptions {
			text_search_config: "english".to_string(),
			highlight_max_words: 1,
			full_text_timeout: Duration::from_millis(0),
		};

		assert_eq!(options.headline_options(), "MaxWords=2, MinWords=1");
		assert_eq!(options.timeout_ms(), 1);
	}
}
