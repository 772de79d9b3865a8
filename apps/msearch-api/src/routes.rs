use axum::{
	Json, Router,
	extract::{Query, State},
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Response},
	routing::get,
};
use serde::Serialize;

use crate::state::AppState;
use msearch_service::{Error, ProfileSearchRequest, SearchRequest, SearchResponse};

const HEADER_SITE_ID: &str = "X-Msearch-Site-Id";
const HEADER_PROFILE_ID: &str = "X-Msearch-Profile-Id";

pub fn router(state: AppState) -> Router {
	Router::new().route("/health", get(health)).route("/v1/search", get(search)).with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new().route("/v1/admin/profiles/search", get(search_profiles)).with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	headers: HeaderMap,
	Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<SearchResponse>, ApiError> {
	let mut req = SearchRequest {
		site_id: site_id(&headers)?,
		viewer_id: profile_id(&headers)?,
		..Default::default()
	};
	let mut q_parts: Vec<String> = Vec::new();

	for (key, value) in pairs {
		match key.as_str() {
			"q" => q_parts.push(value),
			"limit" => req.limit = Some(parse_int("limit", &value)?),
			"offset" => req.offset = Some(parse_int("offset", &value)?),
			_ => req.params.push(key, value),
		}
	}

	req.q = q_parts.join(" ");

	let response = state.service.search(req).await?;

	Ok(Json(response))
}

async fn search_profiles(
	State(state): State<AppState>,
	headers: HeaderMap,
	Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<SearchResponse>, ApiError> {
	let mut req = ProfileSearchRequest {
		site_id: site_id(&headers)?,
		viewer_id: profile_id(&headers)?,
		..Default::default()
	};

	for (key, value) in pairs {
		match key.as_str() {
			"email" => req.email = value,
			"limit" => req.limit = Some(parse_int("limit", &value)?),
			"offset" => req.offset = Some(parse_int("offset", &value)?),
			_ => {},
		}
	}

	let response = state.service.search_profiles(req).await?;

	Ok(Json(response))
}

fn site_id(headers: &HeaderMap) -> Result<i64, ApiError> {
	let Some(raw) = header_value(headers, HEADER_SITE_ID)? else {
		return Err(invalid_request(format!("{HEADER_SITE_ID} header is required.")));
	};
	let site_id = parse_int(HEADER_SITE_ID, raw)?;

	if site_id <= 0 {
		return Err(invalid_request(format!("{HEADER_SITE_ID} must be a positive integer.")));
	}

	Ok(site_id)
}

/// Anonymous when absent.
fn profile_id(headers: &HeaderMap) -> Result<i64, ApiError> {
	let Some(raw) = header_value(headers, HEADER_PROFILE_ID)? else {
		return Ok(0);
	};
	let profile_id = parse_int(HEADER_PROFILE_ID, raw)?;

	if profile_id < 0 {
		return Err(invalid_request(format!("{HEADER_PROFILE_ID} must not be negative.")));
	}

	Ok(profile_id)
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ApiError> {
	let Some(value) = headers.get(name) else {
		return Ok(None);
	};
	let raw = value
		.to_str()
		.map_err(|_| invalid_request(format!("{name} header must be valid ASCII.")))?
		.trim();

	Ok((!raw.is_empty()).then_some(raw))
}

fn parse_int(name: &str, raw: &str) -> Result<i64, ApiError> {
	raw.trim().parse().map_err(|_| invalid_request(format!("{name} must be an integer.")))
}

fn invalid_request(message: String) -> ApiError {
	ApiError::new(StatusCode::BAD_REQUEST, "invalid_request", message)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	errors: Vec<String>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let message = err.to_string();

		match err {
			Error::InvalidRequest { .. } =>
				ApiError::new(StatusCode::BAD_REQUEST, "invalid_request", message),
			Error::OffsetOutOfRange { .. } =>
				ApiError::new(StatusCode::BAD_REQUEST, "offset_out_of_range", message),
			Error::SearchTimeout { .. } =>
				ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "search_timeout", message),
			Error::Summary { status, message } => {
				let status =
					StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

				ApiError::new(status, "summary_failed", message)
			},
			Error::Provider { .. } | Error::Storage { .. } | Error::Internal { .. } => {
				tracing::error!(error = %message, "Search request failed.");

				ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody {
			error_code: self.error_code,
			errors: vec![self.message.clone()],
			message: self.message,
		};

		(self.status, Json(body)).into_response()
	}
}
