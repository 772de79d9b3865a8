use std::sync::Arc;

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use tower::util::ServiceExt;

use msearch_api::{routes, state::AppState};
use msearch_config::{
	Config, Permissions, Postgres, ProviderConfig, Providers as ProviderConfigs, Search, Security,
	Service, Storage,
};
use msearch_domain::{ItemType, Lexicon, Page, criteria::SearchCriteria};
use msearch_service::{
	BoxFuture, PermissionProvider, ProfileDirectory, Providers, SearchIndex, SearchService,
	SummaryProvider,
};
use msearch_storage::{
	memory::MemoryIndex,
	models::{IndexedItem, Microcosm, ProfileRecord, SearchPage},
};

const SITE: &str = "1";

fn provider() -> ProviderConfig {
	ProviderConfig {
		api_base: "http://127.0.0.1:9".to_string(),
		api_key: None,
		path: "/".to_string(),
		timeout_ms: 1_000,
		default_headers: Map::new(),
	}
}

fn test_config() -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			admin_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		storage: Storage {
			postgres: Postgres {
				dsn: "postgres://localhost/unused".to_string(),
				pool_max_conns: 1,
			},
		},
		search: Search {
			default_limit: 25,
			max_limit: 100,
			full_text_timeout_ms: 1_000,
			text_search_config: "english".to_string(),
			highlight_max_words: 35,
		},
		permissions: Permissions { cache_ttl_secs: 60, cache_max_entries: 1_024 },
		providers: ProviderConfigs {
			permissions: provider(),
			summaries: provider(),
			profiles: provider(),
		},
		security: Security { bind_localhost_only: true },
	}
}

struct AllowAll;
impl PermissionProvider for AllowAll {
	fn can_read<'a>(
		&'a self,
		_site_id: i64,
		_microcosm_id: i64,
		_profile_id: i64,
	) -> BoxFuture<'a, msearch_providers::Result<bool>> {
		Box::pin(async { Ok(true) })
	}
}

/// Fails for item 404 with that status and echoes everything else.
struct EchoSummaries;
impl SummaryProvider for EchoSummaries {
	fn get_summary<'a>(
		&'a self,
		_site_id: i64,
		item_type: ItemType,
		item_id: i64,
		_profile_id: i64,
	) -> BoxFuture<'a, msearch_providers::Result<Value>> {
		Box::pin(async move {
			if item_id == 404 {
				return Err(msearch_providers::Error::Status {
					status: 404,
					message: "Item not found.".to_string(),
				});
			}

			Ok(serde_json::json!({ "itemType": item_type, "id": item_id }))
		})
	}
}

struct NoProfiles;
impl ProfileDirectory for NoProfiles {
	fn lookup_by_name<'a>(
		&'a self,
		_site_id: i64,
		_name: &'a str,
	) -> BoxFuture<'a, msearch_providers::Result<Option<i64>>> {
		Box::pin(async { Ok(None) })
	}
}

/// Delegates to the in-memory index but times out every full-text search.
struct SlowTextIndex(MemoryIndex);
impl SearchIndex for SlowTextIndex {
	fn site_microcosm_ids<'a>(
		&'a self,
		site_id: i64,
	) -> BoxFuture<'a, msearch_storage::Result<Vec<i64>>> {
		SearchIndex::site_microcosm_ids(&self.0, site_id)
	}

	fn ignored_microcosm_ids<'a>(
		&'a self,
		profile_id: i64,
	) -> BoxFuture<'a, msearch_storage::Result<Vec<i64>>> {
		SearchIndex::ignored_microcosm_ids(&self.0, profile_id)
	}

	fn cached_permissions<'a>(
		&'a self,
		site_id: i64,
		profile_id: i64,
		microcosm_ids: &'a [i64],
		now: OffsetDateTime,
	) -> BoxFuture<'a, msearch_storage::Result<Vec<(i64, bool)>>> {
		SearchIndex::cached_permissions(&self.0, site_id, profile_id, microcosm_ids, now)
	}

	fn full_text<'a>(
		&'a self,
		_criteria: &'a SearchCriteria,
		_page: Page,
	) -> BoxFuture<'a, msearch_storage::Result<SearchPage>> {
		Box::pin(async { Err(msearch_storage::Error::Timeout { timeout_ms: 1_000 }) })
	}

	fn metadata<'a>(
		&'a self,
		criteria: &'a SearchCriteria,
		page: Page,
	) -> BoxFuture<'a, msearch_storage::Result<SearchPage>> {
		SearchIndex::metadata(&self.0, criteria, page)
	}

	fn profiles_by_email<'a>(
		&'a self,
		site_id: i64,
		email: &'a str,
		page: Page,
	) -> BoxFuture<'a, msearch_storage::Result<SearchPage>> {
		SearchIndex::profiles_by_email(&self.0, site_id, email, page)
	}
}

fn seeded_index() -> MemoryIndex {
	let now = OffsetDateTime::now_utc();
	let mut index = MemoryIndex::from_config(&test_config().search);

	index.upsert_microcosm(Microcosm { site_id: 1, microcosm_id: 10, deleted: false });
	index.index_item(
		IndexedItem::new(1, ItemType::Conversation, 100, 7, now)
			.in_microcosm(10)
			.with_text("Red bikes", "Fixing red bikes"),
	);
	index.index_item(
		IndexedItem::new(1, ItemType::Conversation, 404, 7, now)
			.in_microcosm(10)
			.with_text("Lost", "This one cannot be summarised"),
	);
	index.upsert_profile(ProfileRecord {
		site_id: 1,
		profile_id: 7,
		user_id: 70,
		email: "rider@example.com".to_string(),
		profile_name: "rider".to_string(),
		last_active: now,
	});

	index
}

fn state_with(index: Arc<dyn SearchIndex>) -> AppState {
	let providers =
		Providers::new(Arc::new(AllowAll), Arc::new(EchoSummaries), Arc::new(NoProfiles));
	let lexicon = Arc::new(Lexicon::new().expect("Lexicon must build."));

	AppState::with_service(SearchService::with_providers(test_config(), lexicon, index, providers))
}

fn public_app() -> Router {
	routes::router(state_with(Arc::new(seeded_index())))
}

async fn get(app: Router, uri: &str, site: Option<&str>) -> (StatusCode, Value) {
	let mut builder = Request::builder().uri(uri);

	if let Some(site) = site {
		builder = builder.header("X-Msearch-Site-Id", site).header("X-Msearch-Profile-Id", "50");
	}

	let response = app
		.oneshot(builder.body(Body::empty()).expect("Failed to build request."))
		.await
		.expect("Failed to call the router.");
	let status = response.status();
	let bytes =
		body::to_bytes(response.into_body(), usize::MAX).await.expect("Failed to read body.");
	let json = if bytes.is_empty() {
		Value::Null
	} else {
		serde_json::from_slice(&bytes).expect("Response must be JSON.")
	};

	(status, json)
}

#[tokio::test]
async fn health_ok() {
	let (status, _) = get(public_app(), "/health", None).await;

	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn search_returns_the_envelope() {
	let (status, json) =
		get(public_app(), "/v1/search?q=bikes&type=conversation", Some(SITE)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["query"]["q"], "bikes");
	assert_eq!(json["query"]["searched"], "bikes type:conversation");
	assert_eq!(json["query"]["type"], serde_json::json!(["conversation"]));
	assert_eq!(json["query"]["valid"], true);
	assert_eq!(json["query"]["ignored"], serde_json::json!([]));
	assert!(json["timeTakenInMs"].is_i64());
	assert_eq!(json["results"]["total"], 1);
	assert_eq!(json["results"]["limit"], 25);
	assert_eq!(json["results"]["pages"], 1);

	let first = &json["results"]["result"][0];

	assert_eq!(first["itemType"], "conversation");
	assert_eq!(first["item"]["id"], 100);
	assert_eq!(first["unread"], true);
	assert!(first["lastModified"].is_string());
	assert!(first.get("parentItem").is_none());
}

#[tokio::test]
async fn unknown_tokens_are_echoed_not_rejected() {
	let (status, json) = get(public_app(), "/v1/search?q=colour%3Ared", Some(SITE)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["query"]["valid"], false);
	assert_eq!(json["query"]["ignored"], serde_json::json!(["colour:red"]));
	assert_eq!(json["results"]["total"], 0);
}

#[tokio::test]
async fn missing_site_header_is_a_bad_request() {
	let (status, json) = get(public_app(), "/v1/search?q=bikes", None).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "invalid_request");
	assert_eq!(json["errors"][0], json["message"]);
}

#[tokio::test]
async fn malformed_paging_is_a_bad_request() {
	let (status, json) = get(public_app(), "/v1/search?q=bikes&limit=ten", Some(SITE)).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "invalid_request");

	let (status, _) = get(public_app(), "/v1/search?q=bikes&offset=-1", Some(SITE)).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn offsets_past_the_end_are_rejected() {
	let (status, json) =
		get(public_app(), "/v1/search?type=conversation&id=100&offset=1", Some(SITE)).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "offset_out_of_range");
}

#[tokio::test]
async fn summary_failures_keep_the_collaborator_status() {
	let (status, json) = get(public_app(), "/v1/search?q=lost", Some(SITE)).await;

	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(json["error_code"], "summary_failed");
	assert_eq!(json["message"], "Item not found.");
}

#[tokio::test]
async fn timeouts_are_service_unavailable() {
	let app = routes::router(state_with(Arc::new(SlowTextIndex(seeded_index()))));
	let (status, json) = get(app, "/v1/search?q=bikes", Some(SITE)).await;

	assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
	assert_eq!(json["error_code"], "search_timeout");
}

#[tokio::test]
async fn admin_router_finds_profiles_by_email() {
	let app = routes::admin_router(state_with(Arc::new(seeded_index())));
	let (status, json) =
		get(app, "/v1/admin/profiles/search?email=Rider%40example.com", Some(SITE)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["results"]["total"], 1);
	assert_eq!(json["results"]["result"][0]["itemType"], "profile");
	assert_eq!(json["results"]["result"][0]["item"]["id"], 7);
}

#[tokio::test]
async fn admin_routes_are_not_public() {
	let (status, _) =
		get(public_app(), "/v1/admin/profiles/search?email=rider%40example.com", Some(SITE)).await;

	assert_eq!(status, StatusCode::NOT_FOUND);
}
