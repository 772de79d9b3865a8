use std::sync::Arc;

use msearch_service::SearchService;
use msearch_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<SearchService>,
}
impl AppState {
	pub async fn new(config: msearch_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let service = SearchService::new(config, db)?;

		Ok(Self::with_service(service))
	}

	pub fn with_service(service: SearchService) -> Self {
		Self { service: Arc::new(service) }
	}
}
