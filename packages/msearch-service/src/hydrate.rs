use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tokio::task::JoinSet;

use msearch_domain::ItemType;
use msearch_storage::models::SearchHit;

use crate::{Error, Result, SummaryProvider};

const INTERNAL_STATUS: u16 = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
	pub item_type: ItemType,
	pub item: Value,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub parent_item_type: Option<ItemType>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub parent_item: Option<Value>,
	pub unread: bool,
	pub rank: f64,
	#[serde(with = "crate::time_serde")]
	pub last_modified: OffsetDateTime,
	pub highlight: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Unit {
	sequence: usize,
	item_type: ItemType,
	item_id: i64,
}

#[derive(Debug)]
struct Failure {
	sequence: usize,
	status: u16,
	message: String,
}

/// Fetches a summary for every hit and every distinct parent concurrently.
///
/// Units are numbered in hit order, each hit before its parent, and results are placed
/// back by that number. Every unit is drained before returning. When any fail, the page
/// fails with the status and message of the lowest-numbered failure. Dropping the
/// returned future aborts units still in flight.
pub async fn hydrate(
	summaries: &Arc<dyn SummaryProvider>,
	site_id: i64,
	viewer_id: i64,
	hits: Vec<SearchHit>,
) -> Result<Vec<SearchResult>> {
	let (units, slots) = plan(&hits);
	let mut set = JoinSet::new();

	for unit in units.iter().copied() {
		let summaries = summaries.clone();

		set.spawn(async move {
			let outcome =
				summaries.get_summary(site_id, unit.item_type, unit.item_id, viewer_id).await;

			(unit, outcome)
		});
	}

	let mut summaries_by_sequence: Vec<Option<Value>> = vec![None; units.len()];
	let mut failure: Option<Failure> = None;

	while let Some(joined) = set.join_next().await {
		let next = match joined {
			Ok((unit, Ok(summary))) => {
				tracing::debug!(
					sequence = unit.sequence,
					item_type = unit.item_type.as_str(),
					item_id = unit.item_id,
					"Hydration unit completed."
				);

				summaries_by_sequence[unit.sequence] = Some(summary);

				continue;
			},
			Ok((unit, Err(err))) => {
				let (status, message) = match err {
					msearch_providers::Error::Status { status, message } => (status, message),
					other => (INTERNAL_STATUS, other.to_string()),
				};

				Failure { sequence: unit.sequence, status, message }
			},
			Err(err) =>
				Failure { sequence: usize::MAX, status: INTERNAL_STATUS, message: err.to_string() },
		};

		if failure.as_ref().is_none_or(|current| next.sequence < current.sequence) {
			failure = Some(next);
		}
	}

	if let Some(failure) = failure {
		tracing::warn!(
			units = units.len(),
			sequence = failure.sequence,
			status = failure.status,
			message = %failure.message,
			"Hydration failed."
		);

		return Err(Error::Summary { status: failure.status, message: failure.message });
	}

	let mut results = Vec::with_capacity(hits.len());

	for (hit, (own, parent)) in hits.into_iter().zip(slots) {
		let Some(item) = summaries_by_sequence[own].take() else {
			return Err(Error::Internal {
				message: format!("Summary for {} {} is missing.", hit.item_type, hit.item_id),
			});
		};
		let parent_item = parent.and_then(|sequence| summaries_by_sequence[sequence].clone());

		results.push(SearchResult {
			item_type: hit.item_type,
			item,
			parent_item_type: parent_item.as_ref().and(hit.parent_item_type),
			parent_item,
			unread: hit.unread,
			rank: hit.rank,
			last_modified: hit.last_modified,
			highlight: hit.highlight,
		});
	}

	Ok(results)
}

/// Numbers one unit per hit and one per distinct parent reference.
///
/// Returns the units plus, per hit, the sequence of its own unit and of its parent's.
fn plan(hits: &[SearchHit]) -> (Vec<Unit>, Vec<(usize, Option<usize>)>) {
	let mut units = Vec::with_capacity(hits.len() * 2);
	let mut slots = Vec::with_capacity(hits.len());
	let mut parents: HashMap<(ItemType, i64), usize> = HashMap::new();

	for hit in hits {
		let own = units.len();

		units.push(Unit { sequence: own, item_type: hit.item_type, item_id: hit.item_id });

		let parent = hit.parent().map(|(item_type, item_id)| {
			*parents.entry((item_type, item_id)).or_insert_with(|| {
				let sequence = units.len();

				units.push(Unit { sequence, item_type, item_id });

				sequence
			})
		});

		slots.push((own, parent));
	}

	(units, slots)
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use msearch_domain::ItemType;
	use msearch_storage::models::SearchHit;

	use crate::hydrate::plan;

	fn hit(item_type: ItemType, item_id: i64, parent: Option<(ItemType, i64)>) -> SearchHit {
		SearchHit {
			item_type,
			item_id,
			parent_item_type: parent.map(|(item_type, _)| item_type),
			parent_item_id: parent.map(|(_, item_id)| item_id),
			last_modified: datetime!(2024-06-15 12:00 UTC),
			rank: 1.0,
			highlight: String::new(),
			unread: false,
		}
	}

	#[test]
	fn numbers_each_hit_before_its_parent_and_shares_parents() {
		let hits = vec![
			hit(ItemType::Comment, 11, Some((ItemType::Conversation, 1))),
			hit(ItemType::Conversation, 2, None),
			hit(ItemType::Comment, 12, Some((ItemType::Conversation, 1))),
		];
		let (units, slots) = plan(&hits);
		let order: Vec<(ItemType, i64)> =
			units.iter().map(|unit| (unit.item_type, unit.item_id)).collect();

		assert_eq!(order, vec![
			(ItemType::Comment, 11),
			(ItemType::Conversation, 1),
			(ItemType::Conversation, 2),
			(ItemType::Comment, 12),
		]);
		assert_eq!(slots, vec![(0, Some(1)), (2, None), (3, Some(1))]);
		assert!(units.iter().enumerate().all(|(index, unit)| unit.sequence == index));
	}
}
