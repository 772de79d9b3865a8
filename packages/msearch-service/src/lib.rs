pub mod admin;
pub mod hydrate;
pub mod index;
pub mod permissions;
pub mod search;
pub mod time_serde;

mod error;

pub use admin::ProfileSearchRequest;
pub use error::{Error, Result};
pub use hydrate::SearchResult;
pub use index::{PgIndex, SearchIndex};
pub use permissions::PermissionCache;
pub use search::{QueryEcho, ResultsPage, SearchRequest, SearchResponse};

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use reqwest::Client;
use serde_json::Value;

use msearch_config::Config;
use msearch_domain::{ItemType, Lexicon, PageLimits};
use msearch_providers::{permissions as permission_api, profiles, summaries};
use msearch_storage::{db::Db, search::SearchOptions};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Answers `CanRead(site, microcosm, viewer)`. Called for every microcosm the caches miss.
pub trait PermissionProvider
where
	Self: Send + Sync,
{
	fn can_read<'a>(
		&'a self,
		site_id: i64,
		microcosm_id: i64,
		profile_id: i64,
	) -> BoxFuture<'a, msearch_providers::Result<bool>>;
}

pub trait SummaryProvider
where
	Self: Send + Sync,
{
	fn get_summary<'a>(
		&'a self,
		site_id: i64,
		item_type: ItemType,
		item_id: i64,
		profile_id: i64,
	) -> BoxFuture<'a, msearch_providers::Result<Value>>;
}

pub trait ProfileDirectory
where
	Self: Send + Sync,
{
	fn lookup_by_name<'a>(
		&'a self,
		site_id: i64,
		name: &'a str,
	) -> BoxFuture<'a, msearch_providers::Result<Option<i64>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub permissions: Arc<dyn PermissionProvider>,
	pub summaries: Arc<dyn SummaryProvider>,
	pub profiles: Arc<dyn ProfileDirectory>,
}
impl Providers {
	pub fn new(
		permissions: Arc<dyn PermissionProvider>,
		summaries: Arc<dyn SummaryProvider>,
		profiles: Arc<dyn ProfileDirectory>,
	) -> Self {
		Self { permissions, summaries, profiles }
	}

	/// HTTP clients for every collaborator named in `[providers]`.
	pub fn from_config(cfg: &msearch_config::Providers) -> Result<Self> {
		let http = Arc::new(HttpProviders::from_config(cfg)?);

		Ok(Self { permissions: http.clone(), summaries: http.clone(), profiles: http })
	}
}

pub struct SearchService {
	pub cfg: Config,
	pub lexicon: Arc<Lexicon>,
	pub index: Arc<dyn SearchIndex>,
	pub providers: Providers,
	pub permission_cache: PermissionCache,
}
impl SearchService {
	pub fn new(cfg: Config, db: Db) -> Result<Self> {
		let lexicon = Arc::new(Lexicon::new()?);
		let index = Arc::new(PgIndex::new(db, SearchOptions::from_config(&cfg.search)));
		let providers = Providers::from_config(&cfg.providers)?;

		Ok(Self::with_providers(cfg, lexicon, index, providers))
	}

	pub fn with_providers(
		cfg: Config,
		lexicon: Arc<Lexicon>,
		index: Arc<dyn SearchIndex>,
		providers: Providers,
	) -> Self {
		let permission_cache = PermissionCache::new(
			Duration::from_secs(cfg.permissions.cache_ttl_secs),
			cfg.permissions.cache_max_entries,
		);

		Self { cfg, lexicon, index, providers, permission_cache }
	}

	pub(crate) fn page_limits(&self) -> PageLimits {
		PageLimits {
			default_limit: i64::from(self.cfg.search.default_limit),
			max_limit: i64::from(self.cfg.search.max_limit),
		}
	}
}

struct HttpProviders {
	cfg: msearch_config::Providers,
	permissions: Client,
	summaries: Client,
	profiles: Client,
}
impl HttpProviders {
	fn from_config(cfg: &msearch_config::Providers) -> Result<Self> {
		Ok(Self {
			cfg: cfg.clone(),
			permissions: msearch_providers::client(&cfg.permissions)?,
			summaries: msearch_providers::client(&cfg.summaries)?,
			profiles: msearch_providers::client(&cfg.profiles)?,
		})
	}
}

impl PermissionProvider for HttpProviders {
	fn can_read<'a>(
		&'a self,
		site_id: i64,
		microcosm_id: i64,
		profile_id: i64,
	) -> BoxFuture<'a, msearch_providers::Result<bool>> {
		Box::pin(permission_api::can_read(
			&self.permissions,
			&self.cfg.permissions,
			site_id,
			microcosm_id,
			profile_id,
		))
	}
}

impl SummaryProvider for HttpProviders {
	fn get_summary<'a>(
		&'a self,
		site_id: i64,
		item_type: ItemType,
		item_id: i64,
		profile_id: i64,
	) -> BoxFuture<'a, msearch_providers::Result<Value>> {
		Box::pin(summaries::get_summary(
			&self.summaries,
			&self.cfg.summaries,
			site_id,
			item_type.as_str(),
			item_id,
			profile_id,
		))
	}
}

impl ProfileDirectory for HttpProviders {
	fn lookup_by_name<'a>(
		&'a self,
		site_id: i64,
		name: &'a str,
	) -> BoxFuture<'a, msearch_providers::Result<Option<i64>>> {
		Box::pin(profiles::lookup_by_name(&self.profiles, &self.cfg.profiles, site_id, name))
	}
}
