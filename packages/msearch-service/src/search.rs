use std::time::Instant;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use msearch_domain::{
	AuthorResolution, ItemType, Page, Query, Route, SearchParams, SortMode,
	criteria::{Scope, build_criteria},
};

use crate::{Result, SearchService, hydrate::SearchResult};

#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
	pub site_id: i64,
	/// Zero for anonymous viewers.
	pub viewer_id: i64,
	pub q: String,
	pub params: SearchParams,
	pub limit: Option<i64>,
	pub offset: Option<i64>,
}

/// The query as understood, echoed back with every response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEcho {
	pub q: String,
	pub searched: String,
	pub ignored: Vec<String>,
	#[serde(default, skip_serializing_if = "is_false")]
	pub in_title: bool,
	#[serde(default, skip_serializing_if = "is_false")]
	pub following: bool,
	#[serde(default, skip_serializing_if = "is_false")]
	pub attendee: bool,
	#[serde(default, rename = "type", skip_serializing_if = "Vec::is_empty")]
	pub item_types: Vec<ItemType>,
	#[serde(default, rename = "id", skip_serializing_if = "Vec::is_empty")]
	pub item_ids: Vec<i64>,
	#[serde(default, rename = "forumId", skip_serializing_if = "Vec::is_empty")]
	pub microcosm_ids: Vec<i64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub author_id: Option<i64>,
	#[serde(default, with = "crate::time_serde::option", skip_serializing_if = "Option::is_none")]
	pub since: Option<OffsetDateTime>,
	#[serde(default, with = "crate::time_serde::option", skip_serializing_if = "Option::is_none")]
	pub until: Option<OffsetDateTime>,
	#[serde(default, with = "crate::time_serde::option", skip_serializing_if = "Option::is_none")]
	pub event_after: Option<OffsetDateTime>,
	#[serde(default, with = "crate::time_serde::option", skip_serializing_if = "Option::is_none")]
	pub event_before: Option<OffsetDateTime>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub hashtags: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sort: Option<SortMode>,
	#[serde(default, skip_serializing_if = "is_false")]
	pub has_attachment: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub lat: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub lon: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub radius: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub north: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub east: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub south: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub west: Option<f64>,
	pub valid: bool,
}
impl QueryEcho {
	pub fn new(q: &str, query: &Query) -> Self {
		Self {
			q: q.to_string(),
			searched: query.searched(),
			ignored: query.ignored.clone(),
			in_title: query.in_title,
			following: query.following,
			attendee: query.attendee,
			item_types: query.item_types.iter().copied().collect(),
			item_ids: query.item_ids.iter().copied().collect(),
			microcosm_ids: query.microcosm_ids.iter().copied().collect(),
			author_id: (query.author_id > 0).then_some(query.author_id),
			since: query.since,
			until: query.until,
			event_after: query.event_after,
			event_before: query.event_before,
			hashtags: query.hashtags.clone(),
			sort: (query.sort != SortMode::Relevance).then_some(query.sort),
			has_attachment: query.has_attachment,
			lat: query.geo.lat,
			lon: query.geo.lon,
			radius: query.geo.radius,
			north: query.geo.north,
			east: query.geo.east,
			south: query.geo.south,
			west: query.geo.west,
			valid: query.is_valid(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsPage {
	pub total: i64,
	pub limit: i64,
	pub offset: i64,
	pub pages: i64,
	pub result: Vec<SearchResult>,
}
impl ResultsPage {
	pub fn empty(page: Page) -> Self {
		Self { total: 0, limit: page.limit, offset: page.offset, pages: 0, result: Vec::new() }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
	pub query: QueryEcho,
	pub time_taken_in_ms: i64,
	pub results: ResultsPage,
}
impl SearchResponse {
	pub(crate) fn finish(query: QueryEcho, started: Instant, results: ResultsPage) -> Self {
		let time_taken_in_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

		Self { query, time_taken_in_ms, results }
	}
}

impl SearchService {
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let started = Instant::now();
		let search_id = Uuid::new_v4();
		let page = Page::resolve(req.limit, req.offset, self.page_limits())?;
		let now = OffsetDateTime::now_utc();
		let parsed = msearch_domain::parse(&self.lexicon, &req.q, &req.params, now);
		let author = self.resolve_author(req.site_id, &parsed).await?;
		let query = msearch_domain::validate(parsed, author);
		let echo = QueryEcho::new(&req.q, &query);

		if !query.is_valid() {
			tracing::info!(
				search_id = %search_id,
				ignored = query.ignored.len(),
				"Search query has no usable criteria."
			);

			return Ok(SearchResponse::finish(echo, started, ResultsPage::empty(page)));
		}

		let route = msearch_domain::route(&query);
		let visible =
			self.visible_microcosms(req.site_id, req.viewer_id, &query.microcosm_ids, now).await?;
		let scope =
			Scope { site_id: req.site_id, viewer_id: req.viewer_id, visible_microcosms: &visible };
		let criteria = build_criteria(&self.lexicon, &query, scope);
		let executed = match route {
			Route::FullText => self.index.full_text(&criteria, page).await,
			Route::Metadata => self.index.metadata(&criteria, page).await,
		};
		let executed = match executed {
			Ok(executed) => executed,
			Err(err) => {
				tracing::warn!(
					search_id = %search_id,
					route = route.as_str(),
					error = %err,
					"Search execution failed."
				);

				return Err(err.into());
			},
		};

		page.check_offset(executed.total)?;

		let total = executed.total;
		let hits = executed.hits.len();
		let result = crate::hydrate::hydrate(
			&self.providers.summaries,
			req.site_id,
			req.viewer_id,
			executed.hits,
		)
		.await?;
		let results = ResultsPage {
			total,
			limit: page.limit,
			offset: page.offset,
			pages: page.page_count(total),
			result,
		};
		let response = SearchResponse::finish(echo, started, results);

		tracing::info!(
			search_id = %search_id,
			route = route.as_str(),
			total,
			hits,
			elapsed_ms = response.time_taken_in_ms,
			"Search completed."
		);

		Ok(response)
	}

	/// Looks up `author:<name>` unless an explicit `authorId` already decided the author.
	async fn resolve_author(&self, site_id: i64, query: &Query) -> Result<AuthorResolution> {
		let Some(name) = query.author_name.as_deref() else {
			return Ok(AuthorResolution::NotRequested);
		};

		if query.author_id > 0 {
			return Ok(AuthorResolution::NotRequested);
		}

		let resolved = self.providers.profiles.lookup_by_name(site_id, name).await.inspect_err(
			|err| tracing::warn!(error = %err, site_id, "Author lookup failed."),
		)?;

		Ok(match resolved {
			Some(profile_id) => AuthorResolution::Resolved(profile_id),
			None => AuthorResolution::Unresolved,
		})
	}
}

fn is_false(value: &bool) -> bool {
	!*value
}
