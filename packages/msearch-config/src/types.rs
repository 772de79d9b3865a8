use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub search: Search,
	#[serde(default)]
	pub permissions: Permissions,
	pub providers: Providers,
	#[serde(default)]
	pub security: Security,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Search {
	#[serde(default = "default_limit")]
	pub default_limit: u32,
	#[serde(default = "default_max_limit")]
	pub max_limit: u32,
	pub full_text_timeout_ms: u64,
	/// Postgres text search configuration name passed to `plainto_tsquery`.
	#[serde(default = "default_text_search_config")]
	pub text_search_config: String,
	#[serde(default = "default_highlight_max_words")]
	pub highlight_max_words: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Permissions {
	pub cache_ttl_secs: u64,
	pub cache_max_entries: usize,
}
impl Default for Permissions {
	fn default() -> Self {
		Self { cache_ttl_secs: 60, cache_max_entries: 65_536 }
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub permissions: ProviderConfig,
	pub summaries: ProviderConfig,
	pub profiles: ProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
	pub api_base: String,
	#[serde(default)]
	pub api_key: Option<String>,
	pub path: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Security {
	pub bind_localhost_only: bool,
}
impl Default for Security {
	fn default() -> Self {
		Self { bind_localhost_only: true }
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_limit() -> u32 {
	25
}

fn default_max_limit() -> u32 {
	100
}

fn default_text_search_config() -> String {
	"english".to_string()
}

fn default_highlight_max_words() -> u32 {
	35
}
