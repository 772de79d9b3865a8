pub mod permissions;
pub mod profiles;
pub mod summaries;

mod error;

pub use error::{Error, Result};

use std::time::Duration;

use reqwest::{
	Client, Response,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

use msearch_config::ProviderConfig;

pub fn auth_headers(
	api_key: Option<&str>,
	default_headers: &Map<String, Value>,
) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	if let Some(api_key) = api_key {
		headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);
	}

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

/// Builds a client carrying the provider's timeout and headers on every request.
pub fn client(cfg: &ProviderConfig) -> Result<Client> {
	let headers = auth_headers(cfg.api_key.as_deref(), &cfg.default_headers)?;
	let client = Client::builder()
		.timeout(Duration::from_millis(cfg.timeout_ms))
		.default_headers(headers)
		.build()?;

	Ok(client)
}

pub(crate) fn endpoint(cfg: &ProviderConfig) -> String {
	format!("{}{}", cfg.api_base, cfg.path)
}

/// Turns a non-success response into [`Error::Status`], reading the message from the body.
pub(crate) async fn check_status(res: Response) -> Result<Response> {
	let status = res.status();

	if status.is_success() {
		return Ok(res);
	}

	let body = res.text().await.unwrap_or_default();

	Err(Error::Status { status: status.as_u16(), message: error_message(&body, status.as_u16()) })
}

fn error_message(body: &str, status: u16) -> String {
	if let Ok(json) = serde_json::from_str::<Value>(body) {
		for key in ["message", "error"] {
			if let Some(message) = json.get(key).and_then(Value::as_str) {
				return message.to_string();
			}
		}
	}

	let trimmed = body.trim();

	if trimmed.is_empty() {
		return format!("Request failed with status {status}.");
	}

	trimmed.to_string()
}
