use reqwest::Client;
use serde::Deserialize;

use crate::{Error, Result};
use msearch_config::ProviderConfig;

#[derive(Debug, Deserialize)]
struct CanReadResponse {
	can_read: Option<bool>,
}

/// Asks the permission engine whether `profile_id` may read `microcosm_id`.
pub async fn can_read(
	client: &Client,
	cfg: &ProviderConfig,
	site_id: i64,
	microcosm_id: i64,
	profile_id: i64,
) -> Result<bool> {
	let res = client
		.get(crate::endpoint(cfg))
		.query(&[("site_id", site_id), ("microcosm_id", microcosm_id), ("profile_id", profile_id)])
		.send()
		.await?;
	let body = crate::check_status(res).await?.text().await?;

	parse_can_read(&body)
}

fn parse_can_read(body: &str) -> Result<bool> {
	let parsed: CanReadResponse = serde_json::from_str(body)?;

	parsed.can_read.ok_or_else(|| Error::InvalidResponse {
		message: "Permission response is missing can_read.".to_string(),
	})
}
