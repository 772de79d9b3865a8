use time::OffsetDateTime;

use msearch_domain::ItemType;

/// One executor row before hydration.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
	pub item_type: ItemType,
	pub item_id: i64,
	pub parent_item_type: Option<ItemType>,
	pub parent_item_id: Option<i64>,
	pub last_modified: OffsetDateTime,
	pub rank: f64,
	pub highlight: String,
	pub unread: bool,
}
impl SearchHit {
	pub fn parent(&self) -> Option<(ItemType, i64)> {
		self.parent_item_type.zip(self.parent_item_id)
	}
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
	pub total: i64,
	pub hits: Vec<SearchHit>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct HitRow {
	pub item_type_id: i64,
	pub item_id: i64,
	pub parent_item_type_id: Option<i64>,
	pub parent_item_id: Option<i64>,
	pub last_modified: OffsetDateTime,
	pub rank: f64,
	pub highlight: String,
	pub has_unread: bool,
	pub total: i64,
}
impl HitRow {
	/// Rows whose type id is unknown to this build are dropped by the caller.
	pub(crate) fn into_hit(self) -> Option<SearchHit> {
		Some(SearchHit {
			item_type: ItemType::from_id(self.item_type_id)?,
			item_id: self.item_id,
			parent_item_type: self.parent_item_type_id.and_then(ItemType::from_id),
			parent_item_id: self.parent_item_id,
			last_modified: self.last_modified,
			rank: self.rank,
			highlight: self.highlight,
			unread: self.has_unread,
		})
	}
}

/// Moderation and deletion state along an item's ownership chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Moderation {
	pub item_deleted: bool,
	pub item_moderated: bool,
	pub parent_deleted: bool,
	pub parent_moderated: bool,
	pub microcosm_deleted: bool,
	pub microcosm_moderated: bool,
}

/// Everything the search index knows about one item: its flag record plus indexed text.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedItem {
	pub site_id: i64,
	pub item_type: ItemType,
	pub item_id: i64,
	pub microcosm_id: Option<i64>,
	pub parent_item_type: Option<ItemType>,
	pub parent_item_id: Option<i64>,
	pub parent_microcosm_id: Option<i64>,
	pub author_id: i64,
	pub last_modified: OffsetDateTime,
	pub event_time: Option<OffsetDateTime>,
	pub has_attachment: bool,
	pub moderation: Moderation,
	pub title: String,
	pub body: String,
}
impl IndexedItem {
	pub fn new(
		site_id: i64,
		item_type: ItemType,
		item_id: i64,
		author_id: i64,
		last_modified: OffsetDateTime,
	) -> Self {
		Self {
			site_id,
			item_type,
			item_id,
			microcosm_id: None,
			parent_item_type: None,
			parent_item_id: None,
			parent_microcosm_id: None,
			author_id,
			last_modified,
			event_time: None,
			has_attachment: false,
			moderation: Moderation::default(),
			title: String::new(),
			body: String::new(),
		}
	}

	pub fn in_microcosm(mut self, microcosm_id: i64) -> Self {
		self.microcosm_id = Some(microcosm_id);

		self
	}

	pub fn with_parent(
		mut self,
		item_type: ItemType,
		item_id: i64,
		microcosm_id: Option<i64>,
	) -> Self {
		self.parent_item_type = Some(item_type);
		self.parent_item_id = Some(item_id);
		self.parent_microcosm_id = microcosm_id;

		self
	}

	pub fn with_text(mut self, title: impl Into<String>, body: impl Into<String>) -> Self {
		self.title = title.into();
		self.body = body.into();

		self
	}

	pub fn with_event_time(mut self, event_time: OffsetDateTime) -> Self {
		self.event_time = Some(event_time);

		self
	}

	pub fn with_attachment(mut self) -> Self {
		self.has_attachment = true;

		self
	}

	pub fn with_moderation(mut self, moderation: Moderation) -> Self {
		self.moderation = moderation;

		self
	}

	/// Title and body as one searchable document.
	pub fn document(&self) -> String {
		if self.title.is_empty() {
			self.body.clone()
		} else {
			format!("{}\n{}", self.title, self.body)
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Microcosm {
	pub site_id: i64,
	pub microcosm_id: i64,
	pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
	pub site_id: i64,
	pub profile_id: i64,
	pub user_id: i64,
	pub email: String,
	pub profile_name: String,
	pub last_active: OffsetDateTime,
}
