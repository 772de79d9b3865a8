use std::collections::HashSet;

use time::{
	Date, Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset, macros::format_description,
};

use crate::{
	hashtag::extract_hashtags,
	item_type::Lexicon,
	query::{Query, SortMode},
};

/// Relative dates beyond this many days are treated as malformed.
const MAX_RELATIVE_DAYS: i64 = 36_500;

/// Named request parameters other than `q`, `limit` and `offset`, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
	pairs: Vec<(String, String)>,
}
impl SearchParams {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.pairs.push((key.into(), value.into()));
	}

	pub fn is_empty(&self) -> bool {
		self.pairs.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.pairs.iter().map(|(key, value)| (key.as_str(), value.as_str()))
	}
}

impl<K, V> FromIterator<(K, V)> for SearchParams
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self { pairs: iter.into_iter().map(|(key, value)| (key.into(), value.into())).collect() }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterKey {
	Type,
	Id,
	ForumId,
	Since,
	Until,
	EventAfter,
	EventBefore,
	Attendee,
	Following,
	InTitle,
	Sort,
	Author,
	AuthorId,
	HasAttachment,
	Lat,
	Lon,
	Radius,
	North,
	East,
	South,
	West,
}
impl FilterKey {
	fn parse(raw: &str) -> Option<Self> {
		let key = match raw.to_ascii_lowercase().as_str() {
			"type" => Self::Type,
			"id" => Self::Id,
			"forumid" => Self::ForumId,
			"since" => Self::Since,
			"until" => Self::Until,
			"eventafter" => Self::EventAfter,
			"eventbefore" => Self::EventBefore,
			"attendee" => Self::Attendee,
			"following" => Self::Following,
			"intitle" => Self::InTitle,
			"sort" => Self::Sort,
			"author" => Self::Author,
			"authorid" => Self::AuthorId,
			"hasattachment" => Self::HasAttachment,
			"lat" => Self::Lat,
			"lon" => Self::Lon,
			"radius" => Self::Radius,
			"north" => Self::North,
			"east" => Self::East,
			"south" => Self::South,
			"west" => Self::West,
			_ => return None,
		};

		Some(key)
	}

	/// Time values may carry a `HH:MM` part, so their tokens hold a second colon.
	fn takes_time(self) -> bool {
		matches!(self, Self::Since | Self::Until | Self::EventAfter | Self::EventBefore)
	}
}

/// Builds an unvalidated query from the free-text term and the named parameters.
///
/// Named parameters are applied first, then inline `key:value` tokens found in `q`. Any
/// fragment that cannot be understood lands in `ignored` verbatim instead of failing the
/// request.
pub fn parse(lexicon: &Lexicon, q: &str, params: &SearchParams, now: OffsetDateTime) -> Query {
	let mut query = Query::default();
	let mut seen: HashSet<(String, String)> = HashSet::new();

	for (key, value) in params.iter() {
		let key = key.trim();
		let value = value.trim();

		if value.is_empty() || !seen.insert((key.to_ascii_lowercase(), value.to_string())) {
			continue;
		}

		let fragment = format!("{key}:{value}");
		let applied = FilterKey::parse(key)
			.map(|filter| apply_fragment(lexicon, &mut query, filter, value, &fragment, now))
			.unwrap_or(false);

		if !applied {
			query.ignored.push(fragment);
		}
	}

	let mut free_text: Vec<&str> = Vec::new();

	for token in q.split_whitespace() {
		if !token.contains(':') {
			free_text.push(token);

			continue;
		}

		let applied = match token.split_once(':') {
			Some((key, value)) if !key.is_empty() && !value.is_empty() =>
				match FilterKey::parse(key) {
					Some(filter) if filter.takes_time() || !value.contains(':') =>
						apply_fragment(lexicon, &mut query, filter, value, token, now),
					_ => false,
				},
			_ => false,
		};

		if !applied {
			query.ignored.push(token.to_string());
		}
	}

	query.free_text = free_text.join(" ");
	query.hashtags = extract_hashtags(lexicon, &query.free_text);

	query
}

/// Applies one filter and remembers the fragment for filters validation may drop later.
fn apply_fragment(
	lexicon: &Lexicon,
	query: &mut Query,
	key: FilterKey,
	value: &str,
	fragment: &str,
	now: OffsetDateTime,
) -> bool {
	if !apply(lexicon, query, key, value, now) {
		return false;
	}

	let slot = match key {
		FilterKey::EventAfter => &mut query.raw.event_after,
		FilterKey::EventBefore => &mut query.raw.event_before,
		FilterKey::Attendee => &mut query.raw.attendee,
		_ => return true,
	};

	*slot = Some(fragment.to_string());

	true
}

fn apply(
	lexicon: &Lexicon,
	query: &mut Query,
	key: FilterKey,
	value: &str,
	now: OffsetDateTime,
) -> bool {
	match key {
		FilterKey::Type => lexicon.item_type(value).map(|t| query.item_types.insert(t)).is_some(),
		FilterKey::Id => parse_id(value).map(|id| query.item_ids.insert(id)).is_some(),
		FilterKey::ForumId => parse_id(value).map(|id| query.microcosm_ids.insert(id)).is_some(),
		FilterKey::AuthorId => parse_id(value).map(|id| query.author_id = id).is_some(),
		FilterKey::Author => {
			query.author_name = Some(value.to_string());

			true
		},
		FilterKey::Since => parse_time(value, now).map(|t| query.since = Some(t)).is_some(),
		FilterKey::Until => parse_time(value, now).map(|t| query.until = Some(t)).is_some(),
		FilterKey::EventAfter =>
			parse_time(value, now).map(|t| query.event_after = Some(t)).is_some(),
		FilterKey::EventBefore =>
			parse_time(value, now).map(|t| query.event_before = Some(t)).is_some(),
		FilterKey::Attendee => parse_bool(value).map(|b| query.attendee = b).is_some(),
		FilterKey::Following => parse_bool(value).map(|b| query.following = b).is_some(),
		FilterKey::InTitle => parse_bool(value).map(|b| query.in_title = b).is_some(),
		FilterKey::HasAttachment => parse_bool(value).map(|b| query.has_attachment = b).is_some(),
		FilterKey::Sort => SortMode::parse(value).map(|sort| query.sort = sort).is_some(),
		FilterKey::Lat => parse_coordinate(value, 90.0).map(|v| query.geo.lat = Some(v)).is_some(),
		FilterKey::Lon => parse_coordinate(value, 180.0).map(|v| query.geo.lon = Some(v)).is_some(),
		FilterKey::North =>
			parse_coordinate(value, 90.0).map(|v| query.geo.north = Some(v)).is_some(),
		FilterKey::South =>
			parse_coordinate(value, 90.0).map(|v| query.geo.south = Some(v)).is_some(),
		FilterKey::East =>
			parse_coordinate(value, 180.0).map(|v| query.geo.east = Some(v)).is_some(),
		FilterKey::West =>
			parse_coordinate(value, 180.0).map(|v| query.geo.west = Some(v)).is_some(),
		FilterKey::Radius => value
			.parse::<f64>()
			.ok()
			.filter(|radius| radius.is_finite() && *radius > 0.0)
			.map(|radius| query.geo.radius = Some(radius))
			.is_some(),
	}
}

fn parse_id(value: &str) -> Option<i64> {
	value.parse::<i64>().ok().filter(|id| *id > 0)
}

fn parse_bool(value: &str) -> Option<bool> {
	match value.to_ascii_lowercase().as_str() {
		"true" | "1" | "yes" => Some(true),
		"false" | "0" | "no" => Some(false),
		_ => None,
	}
}

fn parse_coordinate(value: &str, bound: f64) -> Option<f64> {
	value.parse::<f64>().ok().filter(|v| v.is_finite() && (-bound..=bound).contains(v))
}

/// Accepts, in order: a signed day offset from `now`, `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM`.
///
/// Relative values are truncated to the minute so that echoing them back round-trips.
pub fn parse_time(value: &str, now: OffsetDateTime) -> Option<OffsetDateTime> {
	if let Ok(days) = value.parse::<i64>() {
		if days.abs() > MAX_RELATIVE_DAYS {
			return None;
		}

		let now = now.to_offset(UtcOffset::UTC);
		let truncated = now
			- Duration::seconds(i64::from(now.second()))
			- Duration::nanoseconds(i64::from(now.nanosecond()));

		return truncated.checked_add(Duration::days(days));
	}
	if let Ok(date) = Date::parse(value, format_description!("[year]-[month]-[day]")) {
		return Some(date.midnight().assume_utc());
	}

	PrimitiveDateTime::parse(value, format_description!("[year]-[month]-[day]T[hour]:[minute]"))
		.ok()
		.map(PrimitiveDateTime::assume_utc)
}
