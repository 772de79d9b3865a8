//! Backend-neutral search criteria.
//!
//! The builder turns a validated [`Query`] into one predicate tree. Storage backends lower
//! that tree to their own query form, so the full-text and metadata paths can never drift
//! apart filter-for-filter.

use std::collections::BTreeSet;

use time::OffsetDateTime;

use crate::{
	item_type::{ItemType, Lexicon},
	query::{Query, SortMode},
};

/// Columns of the denormalised flag record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
	ItemTypeId,
	ItemId,
	MicrocosmId,
	ParentItemTypeId,
	ParentItemId,
	ParentMicrocosmId,
	AuthorId,
	LastModified,
	/// Start time of the event the row describes; null for every other item type.
	EventTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
	ItemDeleted,
	ItemModerated,
	ParentDeleted,
	ParentModerated,
	MicrocosmDeleted,
	MicrocosmModerated,
	HasAttachment,
}

/// Per-viewer relations that need a join against side tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
	/// The row is a huddle, or a comment on a huddle, that the viewer participates in.
	HuddleParticipant,
	/// The viewer watches the row or its parent.
	Watching,
	/// The row is an event the viewer attends.
	Attending,
	/// The row's author is on the viewer's ignore list.
	IgnoredAuthor,
	/// The row, or its parent, is on the viewer's ignore list.
	IgnoredItem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
	Eq,
	Gte,
	Lte,
}
impl CmpOp {
	pub fn as_sql(self) -> &'static str {
		match self {
			Self::Eq => "=",
			Self::Gte => ">=",
			Self::Lte => "<=",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
	Int(i64),
	Time(OffsetDateTime),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
	True,
	And { args: Vec<Predicate> },
	Or { args: Vec<Predicate> },
	Not { arg: Box<Predicate> },
	Cmp { field: Field, cmp: CmpOp, value: Value },
	In { field: Field, values: Vec<i64> },
	IsTrue { flag: Flag },
	Related { relation: Relation },
	/// Case-insensitive substring probe against the indexed document text.
	TextContains { needle: String },
}
impl Predicate {
	/// Conjunction that collapses trivial shapes.
	pub fn all(args: Vec<Self>) -> Self {
		let mut args: Vec<Self> = args.into_iter().filter(|arg| *arg != Self::True).collect();

		match args.len() {
			0 => Self::True,
			1 => args.remove(0),
			_ => Self::And { args },
		}
	}

	/// Disjunction; an empty list matches nothing.
	pub fn any(mut args: Vec<Self>) -> Self {
		match args.len() {
			0 => Self::not(Self::True),
			1 => args.remove(0),
			_ => Self::Or { args },
		}
	}

	pub fn not(arg: Self) -> Self {
		Self::Not { arg: Box::new(arg) }
	}

	pub fn eq(field: Field, value: i64) -> Self {
		Self::Cmp { field, cmp: CmpOp::Eq, value: Value::Int(value) }
	}

	pub fn is_in(field: Field, values: impl IntoIterator<Item = i64>) -> Self {
		Self::In { field, values: values.into_iter().collect() }
	}

	pub fn flag(flag: Flag) -> Self {
		Self::IsTrue { flag }
	}

	pub fn related(relation: Relation) -> Self {
		Self::Related { relation }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextScope {
	Title,
	Document,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch {
	pub terms: String,
	pub scope: TextScope,
}

/// Result ordering, resolved from the sort mode and whether a text stage exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
	RankThenRecency,
	Recency,
	EventAscending,
	EventDescending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchCriteria {
	pub site_id: i64,
	/// Zero for anonymous viewers.
	pub viewer_id: i64,
	pub predicate: Predicate,
	pub text: Option<TextMatch>,
	pub sort: SortMode,
}
impl SearchCriteria {
	pub fn ordering(&self) -> Ordering {
		match self.sort {
			SortMode::Relevance if self.text.is_some() => Ordering::RankThenRecency,
			SortMode::Relevance | SortMode::Date => Ordering::Recency,
			SortMode::Oldest => Ordering::EventAscending,
			SortMode::Newest => Ordering::EventDescending,
		}
	}
}

/// Who is searching, on which site, and which microcosms they may read there.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
	pub site_id: i64,
	pub viewer_id: i64,
	pub visible_microcosms: &'a BTreeSet<i64>,
}

pub fn build_criteria(lexicon: &Lexicon, query: &Query, scope: Scope<'_>) -> SearchCriteria {
	let mut clauses = exclusions(scope.viewer_id);

	clauses.push(visibility(lexicon, query, scope));

	if !query.microcosm_ids.is_empty() {
		let ids = query.microcosm_ids.iter().copied();

		clauses.push(Predicate::any(vec![
			Predicate::is_in(Field::MicrocosmId, ids.clone()),
			Predicate::all(vec![
				Predicate::eq(Field::ItemTypeId, ItemType::Comment.id()),
				Predicate::is_in(Field::ParentMicrocosmId, ids),
			]),
		]));
	}

	clauses.extend(type_and_id_filters(query));

	if query.author_id > 0 {
		clauses.push(Predicate::eq(Field::AuthorId, query.author_id));
	}

	for (field, cmp, value) in [
		(Field::LastModified, CmpOp::Gte, query.since),
		(Field::LastModified, CmpOp::Lte, query.until),
		(Field::EventTime, CmpOp::Gte, query.event_after),
		(Field::EventTime, CmpOp::Lte, query.event_before),
	] {
		if let Some(value) = value {
			clauses.push(Predicate::Cmp { field, cmp, value: Value::Time(value) });
		}
	}

	if query.attendee {
		clauses.push(Predicate::related(Relation::Attending));
	}
	if query.following {
		clauses.push(Predicate::related(Relation::Watching));
	}
	if query.has_attachment {
		clauses.push(Predicate::flag(Flag::HasAttachment));
	}

	clauses.extend(
		query
			.hashtags
			.iter()
			.map(|tag| Predicate::TextContains { needle: format!("#{tag}") }),
	);

	let text = query.has_free_text().then(|| TextMatch {
		terms: query.free_text.trim().to_string(),
		scope: if query.in_title { TextScope::Title } else { TextScope::Document },
	});

	SearchCriteria {
		site_id: scope.site_id,
		viewer_id: scope.viewer_id,
		predicate: Predicate::all(clauses),
		text,
		sort: query.sort,
	}
}

fn exclusions(viewer_id: i64) -> Vec<Predicate> {
	let mut clauses: Vec<Predicate> = [
		Flag::ItemDeleted,
		Flag::ItemModerated,
		Flag::ParentDeleted,
		Flag::ParentModerated,
		Flag::MicrocosmDeleted,
		Flag::MicrocosmModerated,
	]
	.into_iter()
	.map(|flag| Predicate::not(Predicate::flag(flag)))
	.collect();

	if viewer_id > 0 {
		clauses.push(Predicate::not(Predicate::related(Relation::IgnoredAuthor)));
		clauses.push(Predicate::not(Predicate::related(Relation::IgnoredItem)));
	}

	clauses
}

fn visibility(lexicon: &Lexicon, query: &Query, scope: Scope<'_>) -> Predicate {
	let mut branches = vec![Predicate::is_in(
		Field::ItemTypeId,
		lexicon.public_types().iter().map(|item_type| item_type.id()),
	)];

	if !scope.visible_microcosms.is_empty() {
		let visible = scope.visible_microcosms.iter().copied();

		branches.push(Predicate::is_in(Field::MicrocosmId, visible.clone()));
		branches.push(Predicate::all(vec![
			Predicate::eq(Field::ItemTypeId, ItemType::Comment.id()),
			Predicate::is_in(Field::ParentMicrocosmId, visible),
		]));
	}
	if query.microcosm_ids.is_empty() && scope.viewer_id > 0 {
		branches.push(Predicate::related(Relation::HuddleParticipant));
	}

	Predicate::any(branches)
}

fn type_and_id_filters(query: &Query) -> Vec<Predicate> {
	let types = &query.item_types;
	let ids = &query.item_ids;

	if ids.is_empty() || !types.contains(&ItemType::Comment) {
		let mut clauses = Vec::new();

		if !types.is_empty() {
			clauses.push(Predicate::is_in(Field::ItemTypeId, types.iter().map(|t| t.id())));
		}
		if !ids.is_empty() {
			clauses.push(Predicate::is_in(Field::ItemId, ids.iter().copied()));
		}

		return clauses;
	}

	let others: Vec<i64> =
		types.iter().filter(|t| **t != ItemType::Comment).map(|t| t.id()).collect();
	let mut comment_branch = vec![
		Predicate::eq(Field::ItemTypeId, ItemType::Comment.id()),
		Predicate::is_in(Field::ParentItemId, ids.iter().copied()),
	];

	if others.is_empty() {
		return vec![Predicate::all(comment_branch)];
	}

	comment_branch.push(Predicate::is_in(Field::ParentItemTypeId, others.iter().copied()));

	vec![Predicate::any(vec![
		Predicate::all(vec![
			Predicate::is_in(Field::ItemTypeId, others),
			Predicate::is_in(Field::ItemId, ids.iter().copied()),
		]),
		Predicate::all(comment_branch),
	])]
}
