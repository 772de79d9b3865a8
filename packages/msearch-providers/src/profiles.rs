use reqwest::Client;
use serde::Deserialize;

use crate::Result;
use msearch_config::ProviderConfig;

#[derive(Debug, Deserialize)]
struct LookupResponse {
	#[serde(default)]
	profile_id: Option<i64>,
}

/// Resolves an author display name to a profile id on `site_id`.
pub async fn lookup_by_name(
	client: &Client,
	cfg: &ProviderConfig,
	site_id: i64,
	name: &str,
) -> Result<Option<i64>> {
	let res = client
		.get(crate::endpoint(cfg))
		.query(&[("site_id", site_id.to_string()), ("name", name.to_string())])
		.send()
		.await?;
	let body = crate::check_status(res).await?.text().await?;

	parse_lookup(&body)
}

fn parse_lookup(body: &str) -> Result<Option<i64>> {
	let parsed: LookupResponse = serde_json::from_str(body)?;

	Ok(parsed.profile_id.filter(|id| *id > 0))
}
