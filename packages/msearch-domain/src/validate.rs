use crate::query::{GeoFilter, Query, RawFilters, format_time};

/// Outcome of looking up `author:<name>` in the profile directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorResolution {
	/// No lookup happened, either because no name was given or an explicit id already won.
	NotRequested,
	Resolved(i64),
	Unresolved,
}

/// Applies the cross-field rules in their fixed order and computes validity.
///
/// Everything that gets dropped is recorded in `ignored` so the caller can echo it.
pub fn validate(mut query: Query, author: AuthorResolution) -> Query {
	validate_geo(&mut query);
	validate_event_window(&mut query);
	validate_attendee(&mut query);
	resolve_author(&mut query, author);

	query.raw = RawFilters::default();

	query.valid = query.has_free_text()
		|| !query.item_types.is_empty()
		|| query.author_id > 0
		|| !query.microcosm_ids.is_empty();

	query
}

fn validate_geo(query: &mut Query) {
	let geo = &query.geo;
	let accepted = geo.is_empty()
		|| (geo.radius_complete() && !geo.box_partial())
		|| (geo.box_complete() && !geo.radius_partial());

	if accepted {
		return;
	}

	query.ignored.extend(geo.tokens());
	query.geo = GeoFilter::default();
}

fn validate_event_window(query: &mut Query) {
	if query.is_event_only() {
		return;
	}

	for (key, value, raw) in [
		("eventAfter", query.event_after.take(), query.raw.event_after.take()),
		("eventBefore", query.event_before.take(), query.raw.event_before.take()),
	] {
		if let Some(value) = value {
			query.ignored.push(raw.unwrap_or_else(|| format!("{key}:{}", format_time(value))));
		}
	}
}

fn validate_attendee(query: &mut Query) {
	if query.attendee && !query.is_event_only() {
		query.attendee = false;

		let raw = query.raw.attendee.take();

		query.ignored.push(raw.unwrap_or_else(|| "attendee:true".to_string()));
	}
}

fn resolve_author(query: &mut Query, author: AuthorResolution) {
	let Some(name) = query.author_name.take() else {
		return;
	};

	if query.author_id > 0 {
		query.ignored.push(format!("author:{name}"));

		return;
	}

	match author {
		AuthorResolution::Resolved(id) if id > 0 => query.author_id = id,
		_ => query.ignored.push(format!("author:{name}")),
	}
}
