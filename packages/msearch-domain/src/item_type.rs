use std::{
	collections::HashMap,
	fmt::{Display, Formatter},
};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Result;

const HASHTAG_PATTERN: &str = r"(?:^|\s)#([A-Za-z0-9_]+)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
	Site,
	Microcosm,
	Profile,
	Comment,
	Huddle,
	Conversation,
	Poll,
	Article,
	Event,
	Question,
	Classified,
	Album,
}
impl ItemType {
	pub const ALL: [Self; 12] = [
		Self::Site,
		Self::Microcosm,
		Self::Profile,
		Self::Comment,
		Self::Huddle,
		Self::Conversation,
		Self::Poll,
		Self::Article,
		Self::Event,
		Self::Question,
		Self::Classified,
		Self::Album,
	];

	pub fn id(self) -> i64 {
		match self {
			Self::Site => 1,
			Self::Microcosm => 2,
			Self::Profile => 3,
			Self::Comment => 4,
			Self::Huddle => 5,
			Self::Conversation => 6,
			Self::Poll => 7,
			Self::Article => 8,
			Self::Event => 9,
			Self::Question => 10,
			Self::Classified => 11,
			Self::Album => 12,
		}
	}

	pub fn from_id(id: i64) -> Option<Self> {
		Self::ALL.into_iter().find(|item_type| item_type.id() == id)
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Site => "site",
			Self::Microcosm => "microcosm",
			Self::Profile => "profile",
			Self::Comment => "comment",
			Self::Huddle => "huddle",
			Self::Conversation => "conversation",
			Self::Poll => "poll",
			Self::Article => "article",
			Self::Event => "event",
			Self::Question => "question",
			Self::Classified => "classified",
			Self::Album => "album",
		}
	}
}

impl Display for ItemType {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Read-only lookup tables shared by the parser and the criteria builder.
///
/// Built once at start-up and handed out by reference, so concurrent requests and tests
/// never touch mutable global state.
#[derive(Debug, Clone)]
pub struct Lexicon {
	hashtag: Regex,
	item_types: HashMap<String, ItemType>,
	public_types: Vec<ItemType>,
}
impl Lexicon {
	pub fn new() -> Result<Self> {
		let hashtag = Regex::new(HASHTAG_PATTERN)?;
		let item_types = ItemType::ALL
			.into_iter()
			.map(|item_type| (item_type.as_str().to_string(), item_type))
			.collect();

		Ok(Self { hashtag, item_types, public_types: vec![ItemType::Profile] })
	}

	/// Case-insensitive item type lookup by name.
	pub fn item_type(&self, name: &str) -> Option<ItemType> {
		self.item_types.get(name.trim().to_ascii_lowercase().as_str()).copied()
	}

	/// Item types that are visible site-wide regardless of microcosm permissions.
	pub fn public_types(&self) -> &[ItemType] {
		&self.public_types
	}

	pub(crate) fn hashtag_regex(&self) -> &Regex {
		&self.hashtag
	}
}
