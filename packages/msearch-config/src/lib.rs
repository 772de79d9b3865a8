mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Permissions, Postgres, ProviderConfig, Providers, Search, Security, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("service.admin_bind", &cfg.service.admin_bind),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.search.default_limit == 0 {
		return Err(Error::Validation {
			message: "search.default_limit must be greater than zero.".to_string(),
		});
	}
	if cfg.search.default_limit > cfg.search.max_limit {
		return Err(Error::Validation {
			message: "search.default_limit must not exceed search.max_limit.".to_string(),
		});
	}
	if cfg.search.full_text_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "search.full_text_timeout_ms must be greater than zero.".to_string(),
		});
	}
	// The name is spliced into SQL as a regconfig literal.
	if cfg.search.text_search_config.is_empty()
		|| !cfg.search.text_search_config.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
	{
		return Err(Error::Validation {
			message: "search.text_search_config must be a plain identifier.".to_string(),
		});
	}
	if cfg.search.highlight_max_words == 0 {
		return Err(Error::Validation {
			message: "search.highlight_max_words must be greater than zero.".to_string(),
		});
	}
	if cfg.permissions.cache_max_entries == 0 {
		return Err(Error::Validation {
			message: "permissions.cache_max_entries must be greater than zero.".to_string(),
		});
	}

	for (label, provider) in [
		("permissions", &cfg.providers.permissions),
		("summaries", &cfg.providers.summaries),
		("profiles", &cfg.providers.profiles),
	] {
		if provider.api_base.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("providers.{label}.api_base must be non-empty."),
			});
		}
		if provider.timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("providers.{label}.timeout_ms must be greater than zero."),
			});
		}
		if provider.default_headers.values().any(|value| !value.is_string()) {
			return Err(Error::Validation {
				message: format!("providers.{label}.default_headers values must be strings."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.service.log_level = cfg.service.log_level.trim().to_string();

	if cfg.service.log_level.is_empty() {
		cfg.service.log_level = "info".to_string();
	}

	for provider in [
		&mut cfg.providers.permissions,
		&mut cfg.providers.summaries,
		&mut cfg.providers.profiles,
	] {
		provider.api_base = provider.api_base.trim().trim_end_matches('/').to_string();

		if provider.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
			provider.api_key = None;
		}
	}
}
