use std::collections::BTreeSet;

use time::{Duration, OffsetDateTime, macros::datetime};

use msearch_domain::{
	AuthorResolution, ItemType, Lexicon, Page, SearchParams,
	criteria::{Scope, SearchCriteria, build_criteria},
	parse, validate,
};
use msearch_storage::{
	memory::MemoryIndex,
	models::{IndexedItem, Microcosm, Moderation, ProfileRecord},
};

const SITE: i64 = 1;
const VIEWER: i64 = 50;
const NOW: OffsetDateTime = datetime!(2024-06-15 12:00 UTC);

fn at(hours_ago: i64) -> OffsetDateTime {
	NOW - Duration::hours(hours_ago)
}

fn first_page() -> Page {
	Page { limit: 25, offset: 0 }
}

fn criteria(q: &str, viewer_id: i64, visible: &[i64]) -> SearchCriteria {
	let lexicon = Lexicon::new().expect("Lexicon must build.");
	let query =
		validate(parse(&lexicon, q, &SearchParams::new(), NOW), AuthorResolution::NotRequested);
	let visible: BTreeSet<i64> = visible.iter().copied().collect();
	let scope = Scope { site_id: SITE, viewer_id, visible_microcosms: &visible };

	build_criteria(&lexicon, &query, scope)
}

fn ids(index: &MemoryIndex, criteria: &SearchCriteria) -> Vec<(ItemType, i64)> {
	let page = if criteria.text.is_some() {
		index.full_text(criteria, first_page())
	} else {
		index.metadata(criteria, first_page())
	};

	page.hits.iter().map(|hit| (hit.item_type, hit.item_id)).collect()
}

fn seeded() -> MemoryIndex {
	let mut index = MemoryIndex::new();

	index.upsert_microcosm(Microcosm { site_id: SITE, microcosm_id: 10, deleted: false });
	index.upsert_microcosm(Microcosm { site_id: SITE, microcosm_id: 20, deleted: false });
	index.index_item(
		IndexedItem::new(SITE, ItemType::Conversation, 100, 7, at(5))
			.in_microcosm(10)
			.with_text("Red bikes", "Fixing red bikes #gadgets"),
	);
	index.index_item(
		IndexedItem::new(SITE, ItemType::Comment, 101, 8, at(4))
			.with_parent(ItemType::Conversation, 100, Some(10))
			.with_text("", "I love red bikes"),
	);
	index.index_item(
		IndexedItem::new(SITE, ItemType::Conversation, 200, 7, at(3))
			.in_microcosm(20)
			.with_text("Secret bikes", "Hidden forum about bikes"),
	);
	index.index_item(
		IndexedItem::new(SITE, ItemType::Huddle, 300, 9, at(2))
			.with_text("Private bikes", "Just us and bikes"),
	);
	index.index_item(
		IndexedItem::new(SITE, ItemType::Conversation, 400, 7, at(1))
			.in_microcosm(10)
			.with_text("Deleted bikes", "Gone bikes")
			.with_moderation(Moderation { item_deleted: true, ..Default::default() }),
	);
	index.index_item(
		IndexedItem::new(SITE, ItemType::Profile, 500, 500, at(6)).with_text("bikes fan", ""),
	);
	index.add_huddle_participant(300, VIEWER);

	index
}

#[test]
fn visibility_combines_microcosms_comments_profiles_and_huddles() {
	let index = seeded();
	let found = ids(&index, &criteria("bikes", VIEWER, &[10]));

	assert!(found.contains(&(ItemType::Conversation, 100)));
	assert!(found.contains(&(ItemType::Comment, 101)));
	assert!(found.contains(&(ItemType::Huddle, 300)));
	assert!(found.contains(&(ItemType::Profile, 500)));
	assert!(!found.contains(&(ItemType::Conversation, 200)), "Unreadable microcosm leaked.");
	assert!(!found.contains(&(ItemType::Conversation, 400)), "Deleted item leaked.");
}

#[test]
fn microcosm_filter_hides_huddles_and_profiles() {
	let index = seeded();
	let found = ids(&index, &criteria("bikes forumId:10", VIEWER, &[10]));

	assert_eq!(found, vec![(ItemType::Conversation, 100), (ItemType::Comment, 101)]);
}

#[test]
fn anonymous_viewers_never_see_huddles() {
	let index = seeded();
	let found = ids(&index, &criteria("bikes", 0, &[10]));

	assert!(!found.contains(&(ItemType::Huddle, 300)));
}

#[test]
fn ignored_authors_are_excluded() {
	let mut index = seeded();

	index.add_ignore(VIEWER, ItemType::Profile, 8);

	let found = ids(&index, &criteria("bikes", VIEWER, &[10]));

	assert!(!found.contains(&(ItemType::Comment, 101)));
	assert!(found.contains(&(ItemType::Conversation, 100)));
}

#[test]
fn ignoring_a_conversation_hides_its_comments() {
	let mut index = seeded();

	index.add_ignore(VIEWER, ItemType::Conversation, 100);

	let found = ids(&index, &criteria("bikes", VIEWER, &[10]));

	assert!(!found.contains(&(ItemType::Conversation, 100)));
	assert!(!found.contains(&(ItemType::Comment, 101)));
}

#[test]
fn comment_ids_are_rewritten_to_parent_ids() {
	let index = seeded();
	let found = ids(&index, &criteria("type:comment id:100", VIEWER, &[10]));

	assert_eq!(found, vec![(ItemType::Comment, 101)]);
}

#[test]
fn hashtags_narrow_full_text_and_metadata_alike() {
	let index = seeded();
	let text = ids(&index, &criteria("bikes #gadgets", VIEWER, &[10]));

	assert_eq!(text, vec![(ItemType::Conversation, 100)]);

	let mut metadata = criteria("bikes #gadgets", VIEWER, &[10]);

	metadata.text = None;

	assert_eq!(ids(&index, &metadata), text);
}

#[test]
fn metadata_results_are_a_superset_of_full_text_results() {
	let index = seeded();
	let with_text = ids(&index, &criteria("fixing type:conversation", VIEWER, &[10, 20]));
	let without = ids(&index, &criteria("type:conversation", VIEWER, &[10, 20]));

	assert!(!with_text.is_empty());
	assert!(with_text.iter().all(|hit| without.contains(hit)));
}

#[test]
fn title_scope_only_searches_titles() {
	let index = seeded();
	let found = ids(&index, &criteria("love inTitle:true", VIEWER, &[10]));

	assert!(found.is_empty());
}

#[test]
fn newest_events_order_by_event_time() {
	let mut index = MemoryIndex::new();

	index.upsert_microcosm(Microcosm { site_id: SITE, microcosm_id: 10, deleted: false });

	for (item_id, starts_in_days, modified) in [(1, 3, 1), (2, 10, 9), (3, 1, 2)] {
		index.index_item(
			IndexedItem::new(SITE, ItemType::Event, item_id, 7, at(modified))
				.in_microcosm(10)
				.with_event_time(NOW + Duration::days(starts_in_days)),
		);
	}

	let criteria = criteria("sort:newest type:event", VIEWER, &[10]);
	let page = index.metadata(&criteria, first_page());
	let order: Vec<i64> = page.hits.iter().map(|hit| hit.item_id).collect();

	assert_eq!(order, vec![2, 1, 3]);
	assert!(page.hits.iter().all(|hit| hit.rank == 1.0 && hit.highlight.is_empty()));
}

#[test]
fn attendee_and_following_use_viewer_relations() {
	let mut index = MemoryIndex::new();

	index.upsert_microcosm(Microcosm { site_id: SITE, microcosm_id: 10, deleted: false });
	index.index_item(IndexedItem::new(SITE, ItemType::Event, 1, 7, at(1)).in_microcosm(10));
	index.index_item(IndexedItem::new(SITE, ItemType::Event, 2, 7, at(2)).in_microcosm(10));
	index.add_attendee(2, VIEWER);
	index.add_watcher(VIEWER, ItemType::Event, 1);

	assert_eq!(ids(&index, &criteria("type:event attendee:true", VIEWER, &[10])), vec![(
		ItemType::Event,
		2
	)]);
	assert_eq!(ids(&index, &criteria("type:event following:true", VIEWER, &[10])), vec![(
		ItemType::Event,
		1
	)]);
}

#[test]
fn unread_tracks_read_markers() {
	let mut index = seeded();

	index.mark_read(VIEWER, ItemType::Conversation, 100, at(0));

	let page = index.full_text(&criteria("fixing", VIEWER, &[10]), first_page());

	assert_eq!(page.hits.len(), 1);
	assert!(!page.hits[0].unread);
	assert!(page.hits[0].highlight.contains("<b>Fixing</b>"));

	let page = index.full_text(&criteria("love", VIEWER, &[10]), first_page());

	assert!(page.hits[0].unread);
}

#[test]
fn highlights_follow_the_configured_word_budget() {
	let cfg = msearch_config::Search {
		default_limit: 25,
		max_limit: 100,
		full_text_timeout_ms: 1_000,
		text_search_config: "english".to_string(),
		highlight_max_words: 3,
	};
	let mut index = MemoryIndex::from_config(&cfg);

	index.upsert_microcosm(Microcosm { site_id: SITE, microcosm_id: 10, deleted: false });
	index.index_item(
		IndexedItem::new(SITE, ItemType::Conversation, 1, 7, at(1))
			.in_microcosm(10)
			.with_text("Workshop", "Fixing red bikes takes patience and spare parts"),
	);

	let page = index.full_text(&criteria("red", VIEWER, &[10]), first_page());

	assert_eq!(page.hits[0].highlight, "<b>red</b> bikes takes");
}

#[test]
fn totals_ignore_the_page_window() {
	let index = seeded();
	let criteria = criteria("bikes", VIEWER, &[10]);
	let page = index.full_text(&criteria, Page { limit: 1, offset: 1 });

	assert_eq!(page.total, 4);
	assert_eq!(page.hits.len(), 1);
}

#[test]
fn expired_permission_rows_are_skipped() {
	let mut index = seeded();

	index.upsert_permission(SITE, 10, VIEWER, true, NOW + Duration::minutes(5));
	index.upsert_permission(SITE, 20, VIEWER, false, NOW - Duration::minutes(5));

	assert_eq!(index.cached_permissions(SITE, VIEWER, &[10, 20], NOW), vec![(10, true)]);
	assert_eq!(index.site_microcosm_ids(SITE), vec![10, 20]);
}

#[test]
fn profiles_are_found_by_email_case_insensitively() {
	let mut index = MemoryIndex::new();

	for (profile_id, site_id, hours_ago) in [(1, SITE, 5), (2, SITE, 1), (3, 2, 0)] {
		index.upsert_profile(ProfileRecord {
			site_id,
			profile_id,
			user_id: 77,
			email: "Rider@Example.com".to_string(),
			profile_name: format!("rider{profile_id}"),
			last_active: at(hours_ago),
		});
	}

	let page = index.profiles_by_email(SITE, "rider@example.com", first_page());
	let found: Vec<i64> = page.hits.iter().map(|hit| hit.item_id).collect();

	assert_eq!(page.total, 2);
	assert_eq!(found, vec![2, 1]);
}
