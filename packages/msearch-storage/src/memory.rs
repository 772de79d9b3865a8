//! In-process search index evaluating the same criteria as the Postgres backend.
//!
//! Text matching is a plain word match rather than a stemmed `tsquery`, and ranking is a
//! term-density score; both are close enough for tests and local development.

use std::{
	cmp::Ordering as CmpOrdering,
	collections::{HashMap, HashSet},
};

use time::OffsetDateTime;

use msearch_domain::{
	ItemType, Page,
	criteria::{CmpOp, Field, Flag, Ordering, Predicate, Relation, SearchCriteria, TextScope, Value},
};

use crate::{
	models::{IndexedItem, Microcosm, ProfileRecord, SearchHit, SearchPage},
	queries,
};

const DEFAULT_HIGHLIGHT_MAX_WORDS: usize = 35;

#[derive(Debug, Clone)]
pub struct MemoryIndex {
	items: Vec<IndexedItem>,
	microcosms: Vec<Microcosm>,
	permissions: HashMap<(i64, i64, i64), (bool, OffsetDateTime)>,
	ignores: HashSet<(i64, ItemType, i64)>,
	huddle_profiles: HashSet<(i64, i64)>,
	watchers: HashSet<(i64, ItemType, i64)>,
	attendees: HashSet<(i64, i64)>,
	read_markers: HashMap<(i64, ItemType, i64), OffsetDateTime>,
	profiles: Vec<ProfileRecord>,
	highlight_max_words: usize,
}
impl Default for MemoryIndex {
	fn default() -> Self {
		Self::new()
	}
}
impl MemoryIndex {
	pub fn new() -> Self {
		Self {
			items: Vec::new(),
			microcosms: Vec::new(),
			permissions: HashMap::new(),
			ignores: HashSet::new(),
			huddle_profiles: HashSet::new(),
			watchers: HashSet::new(),
			attendees: HashSet::new(),
			read_markers: HashMap::new(),
			profiles: Vec::new(),
			highlight_max_words: DEFAULT_HIGHLIGHT_MAX_WORDS,
		}
	}

	/// An empty index whose highlights follow `search.highlight_max_words`.
	pub fn from_config(cfg: &msearch_config::Search) -> Self {
		let words = usize::try_from(cfg.highlight_max_words).unwrap_or(usize::MAX).max(1);

		Self { highlight_max_words: words, ..Self::new() }
	}

	pub fn index_item(&mut self, item: IndexedItem) {
		self.items.retain(|existing| {
			existing.item_type != item.item_type || existing.item_id != item.item_id
		});
		self.items.push(item);
	}

	pub fn upsert_microcosm(&mut self, microcosm: Microcosm) {
		self.microcosms.retain(|existing| existing.microcosm_id != microcosm.microcosm_id);
		self.microcosms.push(microcosm);
	}

	pub fn upsert_permission(
		&mut self,
		site_id: i64,
		microcosm_id: i64,
		profile_id: i64,
		can_read: bool,
		expires_at: OffsetDateTime,
	) {
		self.permissions.insert((site_id, microcosm_id, profile_id), (can_read, expires_at));
	}

	pub fn add_ignore(&mut self, profile_id: i64, item_type: ItemType, item_id: i64) {
		self.ignores.insert((profile_id, item_type, item_id));
	}

	pub fn add_huddle_participant(&mut self, huddle_id: i64, profile_id: i64) {
		self.huddle_profiles.insert((huddle_id, profile_id));
	}

	pub fn add_watcher(&mut self, profile_id: i64, item_type: ItemType, item_id: i64) {
		self.watchers.insert((profile_id, item_type, item_id));
	}

	pub fn add_attendee(&mut self, event_id: i64, profile_id: i64) {
		self.attendees.insert((event_id, profile_id));
	}

	pub fn mark_read(
		&mut self,
		profile_id: i64,
		item_type: ItemType,
		item_id: i64,
		read_at: OffsetDateTime,
	) {
		let slot = self.read_markers.entry((profile_id, item_type, item_id)).or_insert(read_at);

		if *slot < read_at {
			*slot = read_at;
		}
	}

	pub fn upsert_profile(&mut self, profile: ProfileRecord) {
		self.profiles.retain(|existing| existing.profile_id != profile.profile_id);
		self.profiles.push(profile);
	}

	pub fn site_microcosm_ids(&self, site_id: i64) -> Vec<i64> {
		let mut ids: Vec<i64> = self
			.microcosms
			.iter()
			.filter(|microcosm| microcosm.site_id == site_id && !microcosm.deleted)
			.map(|microcosm| microcosm.microcosm_id)
			.collect();

		ids.sort_unstable();

		ids
	}

	pub fn ignored_microcosm_ids(&self, profile_id: i64) -> Vec<i64> {
		let mut ids: Vec<i64> = self
			.ignores
			.iter()
			.filter(|(owner, item_type, _)| {
				*owner == profile_id && *item_type == ItemType::Microcosm
			})
			.map(|(_, _, item_id)| *item_id)
			.collect();

		ids.sort_unstable();

		ids
	}

	pub fn cached_permissions(
		&self,
		site_id: i64,
		profile_id: i64,
		microcosm_ids: &[i64],
		now: OffsetDateTime,
	) -> Vec<(i64, bool)> {
		microcosm_ids
			.iter()
			.filter_map(|microcosm_id| {
				self.permissions
					.get(&(site_id, *microcosm_id, profile_id))
					.filter(|(_, expires_at)| *expires_at > now)
					.map(|(can_read, _)| (*microcosm_id, *can_read))
			})
			.collect()
	}

	pub fn profiles_by_email(&self, site_id: i64, email: &str, page: Page) -> SearchPage {
		let email = email.to_lowercase();
		let mut matches: Vec<&ProfileRecord> = self
			.profiles
			.iter()
			.filter(|profile| profile.site_id == site_id && profile.email.to_lowercase() == email)
			.collect();

		matches.sort_by(|a, b| {
			b.last_active.cmp(&a.last_active).then_with(|| a.profile_id.cmp(&b.profile_id))
		});

		let total = matches.len() as i64;
		let hits = paginate(matches, page)
			.into_iter()
			.map(|profile| queries::profile_hit(profile.profile_id, profile.last_active))
			.collect();

		SearchPage { total, hits }
	}

	pub fn full_text(&self, criteria: &SearchCriteria, page: Page) -> SearchPage {
		self.search(criteria, page)
	}

	/// Same filters as [`Self::full_text`] without the text stage; rank is fixed at 1.0.
	pub fn metadata(&self, criteria: &SearchCriteria, page: Page) -> SearchPage {
		let criteria = SearchCriteria { text: None, ..criteria.clone() };

		self.search(&criteria, page)
	}

	fn search(&self, criteria: &SearchCriteria, page: Page) -> SearchPage {
		let terms = criteria.text.as_ref().map(|text| (words(&text.terms), text.scope));
		let mut scored: Vec<(&IndexedItem, f64, String)> = Vec::new();

		for item in self.items.iter().filter(|item| item.site_id == criteria.site_id) {
			if !self.eval(&criteria.predicate, item, criteria.viewer_id) {
				continue;
			}

			match terms.as_ref() {
				Some((terms, scope)) => {
					let searched = match scope {
						TextScope::Title => item.title.clone(),
						TextScope::Document => item.document(),
					};
					let Some(rank) = text_rank(terms, &searched) else {
						continue;
					};

					scored.push((item, rank, self.highlight(terms, &item.document())));
				},
				None => scored.push((item, 1.0, String::new())),
			}
		}

		let ordering = criteria.ordering();

		scored.sort_by(|a, b| compare(ordering, a, b));

		let total = scored.len() as i64;
		let hits = paginate(scored, page)
			.into_iter()
			.map(|(item, rank, highlight)| SearchHit {
				item_type: item.item_type,
				item_id: item.item_id,
				parent_item_type: item.parent_item_type,
				parent_item_id: item.parent_item_id,
				last_modified: item.last_modified,
				rank,
				highlight,
				unread: self.unread(item, criteria.viewer_id),
			})
			.collect();

		SearchPage { total, hits }
	}

	fn eval(&self, predicate: &Predicate, item: &IndexedItem, viewer_id: i64) -> bool {
		match predicate {
			Predicate::True => true,
			Predicate::And { args } => args.iter().all(|arg| self.eval(arg, item, viewer_id)),
			Predicate::Or { args } => args.iter().any(|arg| self.eval(arg, item, viewer_id)),
			Predicate::Not { arg } => !self.eval(arg, item, viewer_id),
			Predicate::Cmp { field, cmp, value } => compare_field(item, *field, *cmp, value),
			Predicate::In { field, values } =>
				int_field(item, *field).map(|v| values.contains(&v)).unwrap_or(false),
			Predicate::IsTrue { flag } => flag_value(item, *flag),
			Predicate::Related { relation } => self.related(*relation, item, viewer_id),
			Predicate::TextContains { needle } =>
				item.document().to_lowercase().contains(&needle.to_lowercase()),
		}
	}

	fn related(&self, relation: Relation, item: &IndexedItem, viewer_id: i64) -> bool {
		let parent = item.parent_item_type.zip(item.parent_item_id);

		match relation {
			Relation::HuddleParticipant => {
				let huddle_id = if item.item_type == ItemType::Huddle {
					Some(item.item_id)
				} else {
					parent.filter(|(t, _)| *t == ItemType::Huddle).map(|(_, id)| id)
				};

				huddle_id.is_some_and(|id| self.huddle_profiles.contains(&(id, viewer_id)))
			},
			Relation::Watching =>
				self.watchers.contains(&(viewer_id, item.item_type, item.item_id))
					|| parent.is_some_and(|(t, id)| self.watchers.contains(&(viewer_id, t, id))),
			Relation::Attending =>
				item.item_type == ItemType::Event
					&& self.attendees.contains(&(item.item_id, viewer_id)),
			Relation::IgnoredAuthor =>
				self.ignores.contains(&(viewer_id, ItemType::Profile, item.author_id)),
			Relation::IgnoredItem =>
				self.ignores.contains(&(viewer_id, item.item_type, item.item_id))
					|| parent.is_some_and(|(t, id)| self.ignores.contains(&(viewer_id, t, id))),
		}
	}

	fn unread(&self, item: &IndexedItem, viewer_id: i64) -> bool {
		if viewer_id <= 0 {
			return false;
		}

		self.read_markers
			.get(&(viewer_id, item.item_type, item.item_id))
			.is_none_or(|read_at| *read_at < item.last_modified)
	}

	fn highlight(&self, terms: &[String], document: &str) -> String {
		let words: Vec<&str> = document.split_whitespace().collect();
		let start = words.iter().position(|word| terms.contains(&normalize(word))).unwrap_or(0);

		words
			.iter()
			.skip(start)
			.take(self.highlight_max_words)
			.map(|word| {
				if terms.contains(&normalize(word)) {
					format!("<b>{word}</b>")
				} else {
					(*word).to_string()
				}
			})
			.collect::<Vec<_>>()
			.join(" ")
	}
}

fn paginate<T>(rows: Vec<T>, page: Page) -> Vec<T> {
	let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
	let limit = usize::try_from(page.limit).unwrap_or(0);

	rows.into_iter().skip(offset).take(limit).collect()
}

fn compare(
	ordering: Ordering,
	a: &(&IndexedItem, f64, String),
	b: &(&IndexedItem, f64, String),
) -> CmpOrdering {
	let primary = match ordering {
		Ordering::RankThenRecency => b.1.total_cmp(&a.1),
		Ordering::Recency => CmpOrdering::Equal,
		Ordering::EventAscending =>
			nulls_last(time_field(a.0, Field::EventTime), time_field(b.0, Field::EventTime), false),
		Ordering::EventDescending =>
			nulls_last(time_field(a.0, Field::EventTime), time_field(b.0, Field::EventTime), true),
	};

	primary
		.then_with(|| b.0.last_modified.cmp(&a.0.last_modified))
		.then_with(|| a.0.item_type.id().cmp(&b.0.item_type.id()))
		.then_with(|| a.0.item_id.cmp(&b.0.item_id))
}

fn nulls_last(
	a: Option<OffsetDateTime>,
	b: Option<OffsetDateTime>,
	descending: bool,
) -> CmpOrdering {
	match (a, b) {
		(Some(a), Some(b)) if descending => b.cmp(&a),
		(Some(a), Some(b)) => a.cmp(&b),
		(Some(_), None) => CmpOrdering::Less,
		(None, Some(_)) => CmpOrdering::Greater,
		(None, None) => CmpOrdering::Equal,
	}
}

fn int_field(item: &IndexedItem, field: Field) -> Option<i64> {
	match field {
		Field::ItemTypeId => Some(item.item_type.id()),
		Field::ItemId => Some(item.item_id),
		Field::MicrocosmId => item.microcosm_id,
		Field::ParentItemTypeId => item.parent_item_type.map(ItemType::id),
		Field::ParentItemId => item.parent_item_id,
		Field::ParentMicrocosmId => item.parent_microcosm_id,
		Field::AuthorId => Some(item.author_id),
		Field::LastModified | Field::EventTime => None,
	}
}

fn time_field(item: &IndexedItem, field: Field) -> Option<OffsetDateTime> {
	match field {
		Field::LastModified => Some(item.last_modified),
		Field::EventTime if item.item_type == ItemType::Event => item.event_time,
		_ => None,
	}
}

fn compare_field(item: &IndexedItem, field: Field, cmp: CmpOp, value: &Value) -> bool {
	let ordering = match value {
		Value::Int(value) => int_field(item, field).map(|actual| actual.cmp(value)),
		Value::Time(value) => time_field(item, field).map(|actual| actual.cmp(value)),
	};

	match (ordering, cmp) {
		(Some(ordering), CmpOp::Eq) => ordering == CmpOrdering::Equal,
		(Some(ordering), CmpOp::Gte) => ordering != CmpOrdering::Less,
		(Some(ordering), CmpOp::Lte) => ordering != CmpOrdering::Greater,
		(None, _) => false,
	}
}

fn flag_value(item: &IndexedItem, flag: Flag) -> bool {
	let moderation = &item.moderation;

	match flag {
		Flag::ItemDeleted => moderation.item_deleted,
		Flag::ItemModerated => moderation.item_moderated,
		Flag::ParentDeleted => moderation.parent_deleted,
		Flag::ParentModerated => moderation.parent_moderated,
		Flag::MicrocosmDeleted => moderation.microcosm_deleted,
		Flag::MicrocosmModerated => moderation.microcosm_moderated,
		Flag::HasAttachment => item.has_attachment,
	}
}

fn normalize(word: &str) -> String {
	word.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect()
}

fn words(text: &str) -> Vec<String> {
	let mut out: Vec<String> = Vec::new();

	for word in text.split_whitespace().map(normalize) {
		if !word.is_empty() && !out.contains(&word) {
			out.push(word);
		}
	}

	out
}

/// Every term must occur; the score is the share of document words that are hits.
fn text_rank(terms: &[String], text: &str) -> Option<f64> {
	if terms.is_empty() {
		return None;
	}

	let document: Vec<String> = text.split_whitespace().map(normalize).collect();

	if !terms.iter().all(|term| document.contains(term)) {
		return None;
	}

	let hits = document.iter().filter(|word| terms.contains(word)).count();

	Some(hits as f64 / document.len() as f64)
}
