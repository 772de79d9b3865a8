use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};
use msearch_config::ProviderConfig;

/// Fetches the display summary of one item as seen by `profile_id`.
///
/// The summary body is passed through untouched. A non-success status surfaces as
/// [`Error::Status`] so callers can propagate it to their own clients.
pub async fn get_summary(
	client: &Client,
	cfg: &ProviderConfig,
	site_id: i64,
	item_type: &str,
	item_id: i64,
	profile_id: i64,
) -> Result<Value> {
	let res = client
		.get(crate::endpoint(cfg))
		.query(&[
			("site_id", site_id.to_string()),
			("item_type", item_type.to_string()),
			("item_id", item_id.to_string()),
			("profile_id", profile_id.to_string()),
		])
		.send()
		.await?;
	let json: Value = crate::check_status(res).await?.json().await?;

	if json.is_null() {
		return Err(Error::InvalidResponse {
			message: format!("Summary for {item_type} {item_id} is empty."),
		});
	}

	Ok(json)
}
