use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, Time, UtcOffset, macros::format_description};

use crate::item_type::ItemType;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
	#[default]
	Relevance,
	Date,
	Oldest,
	Newest,
}
impl SortMode {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"relevance" => Some(Self::Relevance),
			"date" => Some(Self::Date),
			"oldest" => Some(Self::Oldest),
			"newest" => Some(Self::Newest),
			_ => None,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Relevance => "relevance",
			Self::Date => "date",
			Self::Oldest => "oldest",
			Self::Newest => "newest",
		}
	}
}

/// Geo filter fields. They are validated for all-or-nothing presence but never executed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeoFilter {
	pub lat: Option<f64>,
	pub lon: Option<f64>,
	pub radius: Option<f64>,
	pub north: Option<f64>,
	pub east: Option<f64>,
	pub south: Option<f64>,
	pub west: Option<f64>,
}
impl GeoFilter {
	pub fn is_empty(&self) -> bool {
		self.fields().iter().all(|(_, value)| value.is_none())
	}

	pub fn radius_complete(&self) -> bool {
		self.lat.is_some() && self.lon.is_some() && self.radius.is_some()
	}

	pub fn radius_partial(&self) -> bool {
		self.lat.is_some() || self.lon.is_some() || self.radius.is_some()
	}

	pub fn box_complete(&self) -> bool {
		self.north.is_some() && self.east.is_some() && self.south.is_some() && self.west.is_some()
	}

	pub fn box_partial(&self) -> bool {
		self.north.is_some() || self.east.is_some() || self.south.is_some() || self.west.is_some()
	}

	/// Every populated field as a `key:value` token, in declaration order.
	pub fn tokens(&self) -> Vec<String> {
		self.fields()
			.into_iter()
			.filter_map(|(key, value)| value.map(|value| format!("{key}:{value}")))
			.collect()
	}

	fn fields(&self) -> [(&'static str, Option<f64>); 7] {
		[
			("lat", self.lat),
			("lon", self.lon),
			("radius", self.radius),
			("north", self.north),
			("east", self.east),
			("south", self.south),
			("west", self.west),
		]
	}
}

/// Fragments as the user typed them, for filters validation may drop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFilters {
	pub event_after: Option<String>,
	pub event_before: Option<String>,
	pub attendee: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
	pub free_text: String,
	pub in_title: bool,
	pub following: bool,
	pub attendee: bool,
	pub item_types: BTreeSet<ItemType>,
	pub item_ids: BTreeSet<i64>,
	pub microcosm_ids: BTreeSet<i64>,
	/// Zero when unset.
	pub author_id: i64,
	/// Display name awaiting resolution; always `None` after validation.
	pub author_name: Option<String>,
	pub since: Option<OffsetDateTime>,
	pub until: Option<OffsetDateTime>,
	pub event_after: Option<OffsetDateTime>,
	pub event_before: Option<OffsetDateTime>,
	pub hashtags: Vec<String>,
	pub sort: SortMode,
	pub has_attachment: bool,
	pub geo: GeoFilter,
	pub ignored: Vec<String>,
	/// Always empty after validation.
	pub raw: RawFilters,
	/// Set by validation.
	pub valid: bool,
}
impl Query {
	pub fn is_valid(&self) -> bool {
		self.valid
	}

	pub fn has_free_text(&self) -> bool {
		!self.free_text.trim().is_empty()
	}

	/// True when the type filter is exactly `{event}`.
	pub fn is_event_only(&self) -> bool {
		self.item_types.len() == 1 && self.item_types.contains(&ItemType::Event)
	}

	/// Canonical query string; parsing it again yields an equivalent query.
	pub fn searched(&self) -> String {
		let mut parts: Vec<String> = Vec::new();

		if self.has_free_text() {
			parts.push(self.free_text.clone());
		}

		parts.extend(self.item_types.iter().map(|item_type| format!("type:{item_type}")));
		parts.extend(self.item_ids.iter().map(|id| format!("id:{id}")));
		parts.extend(self.microcosm_ids.iter().map(|id| format!("forumId:{id}")));

		if self.author_id > 0 {
			parts.push(format!("authorId:{}", self.author_id));
		}
		if let Some(name) = self.author_name.as_ref() {
			parts.push(format!("author:{name}"));
		}

		for (key, value) in [
			("since", self.since),
			("until", self.until),
			("eventAfter", self.event_after),
			("eventBefore", self.event_before),
		] {
			if let Some(value) = value {
				parts.push(format!("{key}:{}", format_time(value)));
			}
		}
		for (key, enabled) in [
			("inTitle", self.in_title),
			("following", self.following),
			("attendee", self.attendee),
			("hasAttachment", self.has_attachment),
		] {
			if enabled {
				parts.push(format!("{key}:true"));
			}
		}

		if self.sort != SortMode::Relevance {
			parts.push(format!("sort:{}", self.sort.as_str()));
		}

		parts.extend(self.geo.tokens());

		parts.join(" ")
	}
}

/// Formats a filter timestamp in the shortest form the parser accepts back.
pub fn format_time(value: OffsetDateTime) -> String {
	let value = value.to_offset(UtcOffset::UTC);
	let formatted = if value.time() == Time::MIDNIGHT {
		value.format(format_description!("[year]-[month]-[day]"))
	} else {
		value.format(format_description!("[year]-[month]-[day]T[hour]:[minute]"))
	};

	formatted.unwrap_or_default()
}
