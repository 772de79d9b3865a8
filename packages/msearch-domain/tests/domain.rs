use std::collections::BTreeSet;

use time::{OffsetDateTime, macros::datetime};

use msearch_domain::{
	AuthorResolution, ItemType, Lexicon, Query, RawFilters, Route, SearchParams, SortMode, parse,
	route, validate,
};

const NOW: OffsetDateTime = datetime!(2024-06-15 10:20:30 UTC);

fn lexicon() -> Lexicon {
	Lexicon::new().expect("Lexicon must build.")
}

fn parse_and_validate(lexicon: &Lexicon, q: &str) -> Query {
	validate(parse(lexicon, q, &SearchParams::new(), NOW), AuthorResolution::NotRequested)
}

#[test]
fn newest_events_route_to_metadata() {
	let query = parse_and_validate(&lexicon(), "sort:newest type:event");

	assert_eq!(route(&query), Route::Metadata);
	assert_eq!(query.sort, SortMode::Newest);
	assert_eq!(query.item_types, BTreeSet::from([ItemType::Event]));
	assert!(query.is_valid());
}

#[test]
fn hashtags_stay_in_free_text() {
	let query = parse_and_validate(&lexicon(), "widgets #gadgets type:conversation type:huddle");

	assert_eq!(query.free_text, "widgets #gadgets");
	assert_eq!(query.hashtags, vec!["gadgets".to_string()]);
	assert_eq!(query.item_types, BTreeSet::from([ItemType::Conversation, ItemType::Huddle]));
	assert_eq!(route(&query), Route::FullText);
}

#[test]
fn event_window_without_event_type_is_ignored() {
	let query = parse_and_validate(&lexicon(), "type:poll eventAfter:2024-01-01");

	assert_eq!(query.event_after, None);
	assert_eq!(query.ignored, vec!["eventAfter:2024-01-01".to_string()]);
	assert!(query.is_valid());
}

#[test]
fn dropped_event_filters_echo_what_was_typed() {
	let query = parse_and_validate(&lexicon(), "type:poll eventBefore:-1 attendee:yes");

	assert_eq!(query.event_before, None);
	assert!(!query.attendee);
	assert_eq!(query.ignored, vec!["eventBefore:-1", "attendee:yes"]);
	assert_eq!(query.raw, RawFilters::default());
}

#[test]
fn dropped_named_event_filters_echo_key_and_value() {
	let params: SearchParams =
		[("type", "poll"), ("eventAfter", "2024-01-01T09:00")].into_iter().collect();
	let query = validate(parse(&lexicon(), "", &params, NOW), AuthorResolution::NotRequested);

	assert_eq!(query.ignored, vec!["eventAfter:2024-01-01T09:00"]);
}

#[test]
fn inline_datetimes_apply_to_until() {
	let query = parse_and_validate(&lexicon(), "bikes until:2024-06-01T08:30");

	assert_eq!(query.until, Some(datetime!(2024-06-01 08:30 UTC)));
	assert!(query.ignored.is_empty());
}

#[test]
fn event_window_survives_for_event_only_queries() {
	let query =
		parse_and_validate(&lexicon(), "type:event eventAfter:2024-01-01 eventBefore:2024-02-01");

	assert_eq!(query.event_after, Some(datetime!(2024-01-01 00:00 UTC)));
	assert_eq!(query.event_before, Some(datetime!(2024-02-01 00:00 UTC)));
	assert!(query.ignored.is_empty());
}

#[test]
fn ignored_tokens_never_make_a_query_valid() {
	let query = parse_and_validate(&lexicon(), "colour:red id:abc forumId:0 type:thread a:b:c");

	assert!(!query.is_valid());
	assert_eq!(query.ignored, vec!["colour:red", "id:abc", "forumId:0", "type:thread", "a:b:c"]);
}

#[test]
fn partial_geo_is_cleared_into_ignored() {
	let query = parse_and_validate(&lexicon(), "pubs lat:51.5 lon:-0.12");

	assert!(query.geo.is_empty());
	assert_eq!(query.ignored, vec!["lat:51.5", "lon:-0.12"]);
	assert!(query.is_valid());
}

#[test]
fn searched_echo_reparses_to_the_same_query() {
	let lexicon = lexicon();
	let params: SearchParams = [("forumId", "4"), ("author", "alice")].into_iter().collect();
	let first = validate(
		parse(
			&lexicon,
			"Bikes  #Fixie type:event id:12 since:-7 until:2024-06-01T08:30 eventBefore:3 \
			 attendee:yes following:1 inTitle:true hasAttachment:true sort:oldest \
			 lat:51.5 lon:-0.12 radius:2.5 colour:red",
			&params,
			NOW,
		),
		AuthorResolution::Resolved(99),
	);

	assert!(first.is_valid());
	assert_eq!(first.author_id, 99);

	let second = validate(
		parse(&lexicon, &first.searched(), &SearchParams::new(), NOW),
		AuthorResolution::NotRequested,
	);

	assert!(second.ignored.is_empty(), "Unexpected ignored tokens: {:?}", second.ignored);
	assert_eq!(second, Query { ignored: Vec::new(), ..first.clone() });
	assert_eq!(second.searched(), first.searched());
}

#[test]
fn sort_modes_serialize_lowercase() {
	let value = serde_json::to_value(SortMode::Newest).expect("Failed to serialize sort mode.");

	assert_eq!(value, serde_json::json!("newest"));
}
