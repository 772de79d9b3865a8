//! Lowering of search criteria to Postgres SQL.
//!
//! Every value is bound; only column names and operators are spliced into the text.

use sqlx::{Postgres, QueryBuilder};

use msearch_domain::{
	ItemType,
	criteria::{Field, Flag, Ordering, Predicate, Relation, SearchCriteria, TextScope, Value},
};

fn column(field: Field) -> &'static str {
	match field {
		Field::ItemTypeId => "f.item_type_id",
		Field::ItemId => "f.item_id",
		Field::MicrocosmId => "f.microcosm_id",
		Field::ParentItemTypeId => "f.parent_item_type_id",
		Field::ParentItemId => "f.parent_item_id",
		Field::ParentMicrocosmId => "f.parent_microcosm_id",
		Field::AuthorId => "f.created_by",
		Field::LastModified => "f.last_modified",
		Field::EventTime => "e.event_when",
	}
}

fn flag_column(flag: Flag) -> &'static str {
	match flag {
		Flag::ItemDeleted => "f.item_is_deleted",
		Flag::ItemModerated => "f.item_is_moderated",
		Flag::ParentDeleted => "f.parent_is_deleted",
		Flag::ParentModerated => "f.parent_is_moderated",
		Flag::MicrocosmDeleted => "f.microcosm_is_deleted",
		Flag::MicrocosmModerated => "f.microcosm_is_moderated",
		Flag::HasAttachment => "f.has_attachment",
	}
}

pub(crate) fn push_predicate(
	builder: &mut QueryBuilder<'_, Postgres>,
	predicate: &Predicate,
	viewer_id: i64,
) {
	match predicate {
		Predicate::True => {
			builder.push("TRUE");
		},
		Predicate::And { args } => push_joined(builder, args, " AND ", "TRUE", viewer_id),
		Predicate::Or { args } => push_joined(builder, args, " OR ", "FALSE", viewer_id),
		Predicate::Not { arg } => {
			builder.push("NOT (");
			push_predicate(builder, arg, viewer_id);
			builder.push(")");
		},
		Predicate::Cmp { field, cmp, value } => {
			builder.push(column(*field));
			builder.push(" ");
			builder.push(cmp.as_sql());
			builder.push(" ");

			match value {
				Value::Int(value) => builder.push_bind(*value),
				Value::Time(value) => builder.push_bind(*value),
			};
		},
		Predicate::In { values, .. } if values.is_empty() => {
			builder.push("FALSE");
		},
		Predicate::In { field, values } => {
			builder.push(column(*field));
			builder.push(" = ANY(");
			builder.push_bind(values.clone());
			builder.push(")");
		},
		Predicate::IsTrue { flag } => {
			builder.push(flag_column(*flag));
		},
		Predicate::Related { relation } => push_relation(builder, *relation, viewer_id),
		Predicate::TextContains { needle } => {
			builder.push(
				"EXISTS (SELECT 1 FROM search_index tc \
				 WHERE tc.item_type_id = f.item_type_id AND tc.item_id = f.item_id \
				 AND tc.document_text ILIKE ",
			);
			builder.push_bind(format!("%{}%", escape_like(needle)));
			builder.push(")");
		},
	}
}

fn push_joined(
	builder: &mut QueryBuilder<'_, Postgres>,
	args: &[Predicate],
	separator: &str,
	empty: &str,
	viewer_id: i64,
) {
	if args.is_empty() {
		builder.push(empty);

		return;
	}

	builder.push("(");

	for (idx, arg) in args.iter().enumerate() {
		if idx > 0 {
			builder.push(separator);
		}

		push_predicate(builder, arg, viewer_id);
	}

	builder.push(")");
}

fn push_relation(builder: &mut QueryBuilder<'_, Postgres>, relation: Relation, viewer_id: i64) {
	let huddle = ItemType::Huddle.id();

	match relation {
		Relation::HuddleParticipant => {
			builder.push("EXISTS (SELECT 1 FROM huddle_profiles hp WHERE hp.profile_id = ");
			builder.push_bind(viewer_id);
			builder.push(format!(
				" AND ((f.item_type_id = {huddle} AND hp.huddle_id = f.item_id) \
				 OR (f.parent_item_type_id = {huddle} AND hp.huddle_id = f.parent_item_id)))"
			));
		},
		Relation::Watching => {
			builder.push("EXISTS (SELECT 1 FROM watchers w WHERE w.profile_id = ");
			builder.push_bind(viewer_id);
			builder.push(
				" AND ((w.item_type_id = f.item_type_id AND w.item_id = f.item_id) \
				 OR (w.item_type_id = f.parent_item_type_id AND w.item_id = f.parent_item_id)))",
			);
		},
		Relation::Attending => {
			builder.push("EXISTS (SELECT 1 FROM attendees a WHERE a.profile_id = ");
			builder.push_bind(viewer_id);
			builder.push(format!(
				" AND a.attending AND f.item_type_id = {} AND a.event_id = f.item_id)",
				ItemType::Event.id()
			));
		},
		Relation::IgnoredAuthor => {
			builder.push("EXISTS (SELECT 1 FROM ignores ia WHERE ia.profile_id = ");
			builder.push_bind(viewer_id);
			builder.push(format!(
				" AND ia.item_type_id = {} AND ia.item_id = f.created_by)",
				ItemType::Profile.id()
			));
		},
		Relation::IgnoredItem => {
			builder.push("EXISTS (SELECT 1 FROM ignores ii WHERE ii.profile_id = ");
			builder.push_bind(viewer_id);
			builder.push(
				" AND ((ii.item_type_id = f.item_type_id AND ii.item_id = f.item_id) \
				 OR (ii.item_type_id = f.parent_item_type_id AND ii.item_id = f.parent_item_id)))",
			);
		},
	}
}

/// `FROM ... WHERE ...` shared by the count and page queries of both executors.
///
/// With a text stage the source also exposes `si` (the index row) and `tsq` (the parsed
/// query).
pub(crate) fn push_source(
	builder: &mut QueryBuilder<'_, Postgres>,
	criteria: &SearchCriteria,
	text_search_config: &str,
) {
	builder.push(format!(
		"\nFROM flags f\nLEFT JOIN events e ON f.item_type_id = {} AND e.event_id = f.item_id",
		ItemType::Event.id()
	));

	if let Some(text) = criteria.text.as_ref() {
		builder.push(
			"\nJOIN search_index si ON si.item_type_id = f.item_type_id AND si.item_id = f.item_id\
			 \nCROSS JOIN plainto_tsquery(",
		);
		builder.push_bind(text_search_config.to_string());
		builder.push("::regconfig, ");
		builder.push_bind(text.terms.clone());
		builder.push(") AS tsq");
	}

	builder.push("\nWHERE f.site_id = ");
	builder.push_bind(criteria.site_id);

	if let Some(text) = criteria.text.as_ref() {
		builder.push(match text.scope {
			TextScope::Title => "\n\tAND si.title_vector @@ tsq",
			TextScope::Document => "\n\tAND si.document_vector @@ tsq",
		});
	}

	builder.push("\n\tAND ");
	push_predicate(builder, &criteria.predicate, criteria.viewer_id);
}

pub(crate) fn push_unread(builder: &mut QueryBuilder<'_, Postgres>, viewer_id: i64) {
	if viewer_id <= 0 {
		builder.push("FALSE");

		return;
	}

	builder.push("NOT EXISTS (SELECT 1 FROM read_markers rm WHERE rm.profile_id = ");
	builder.push_bind(viewer_id);
	builder.push(
		" AND rm.item_type_id = f.item_type_id AND rm.item_id = f.item_id \
		 AND rm.read_at >= f.last_modified)",
	);
}

pub(crate) fn push_order(builder: &mut QueryBuilder<'_, Postgres>, ordering: Ordering) {
	builder.push(match ordering {
		Ordering::RankThenRecency => "\nORDER BY rank DESC, f.last_modified DESC",
		Ordering::Recency => "\nORDER BY f.last_modified DESC",
		Ordering::EventAscending => "\nORDER BY e.event_when ASC NULLS LAST, f.last_modified DESC",
		Ordering::EventDescending =>
			"\nORDER BY e.event_when DESC NULLS LAST, f.last_modified DESC",
	});
	builder.push(", f.item_type_id ASC, f.item_id ASC");
}

fn escape_like(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());

	for ch in raw.chars() {
		if matches!(ch, '%' | '_' | '\\') {
			out.push('\\');
		}

		out.push(ch);
	}

	out
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeSet;

	use sqlx::{Postgres, QueryBuilder};

	use msearch_domain::{
		Lexicon, Query,
		criteria::{Ordering, Scope, build_criteria},
	};

	use crate::sql::{escape_like, push_order, push_source};

	#[test]
	fn escapes_like_wildcards() {
		assert_eq!(escape_like("#100%_done\\"), "#100\\%\\_done\\\\");
	}

	#[test]
	fn text_stage_joins_index_and_binds_terms() {
		let lexicon = Lexicon::new().expect("lexicon");
		let visible = BTreeSet::from([3]);
		let query = Query { free_text: "bikes".to_string(), in_title: true, ..Default::default() };
		let criteria = build_criteria(&lexicon, &query, Scope {
			site_id: 1,
			viewer_id: 5,
			visible_microcosms: &visible,
		});
		let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT f.item_id");

		push_source(&mut builder, &criteria, "english");
		push_order(&mut builder, criteria.ordering());

		let sql = builder.sql();

		assert!(sql.contains("plainto_tsquery($1::regconfig, $2)"));
		assert!(sql.contains("si.title_vector @@ tsq"));
		assert!(sql.contains("huddle_profiles"));
		assert!(sql.contains("ORDER BY rank DESC"));
		assert!(!sql.contains("bikes"));
	}

	#[test]
	fn metadata_source_has_no_text_stage() {
		let lexicon = Lexicon::new().expect("lexicon");
		let visible = BTreeSet::new();
		let criteria = build_criteria(&lexicon, &Query::default(), Scope {
			site_id: 1,
			viewer_id: 0,
			visible_microcosms: &visible,
		});
		let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT COUNT(*)");

		push_source(&mut builder, &criteria, "english");
		push_order(&mut builder, Ordering::EventDescending);

		let sql = builder.sql();

		assert!(!sql.contains("search_index si"));
		assert!(sql.contains("e.event_when DESC NULLS LAST"));
	}
}
