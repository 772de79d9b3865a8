use std::{
	collections::{BTreeSet, HashMap},
	sync::{Mutex, MutexGuard},
	time::{Duration, Instant},
};

use time::OffsetDateTime;

use crate::{Result, SearchService};

type PermissionKey = (i64, i64, i64);

/// Process-level `CanRead` cache keyed by `(site, microcosm, profile)` with a fixed TTL.
pub struct PermissionCache {
	ttl: Duration,
	max_entries: usize,
	entries: Mutex<HashMap<PermissionKey, (bool, Instant)>>,
}
impl PermissionCache {
	pub fn new(ttl: Duration, max_entries: usize) -> Self {
		Self { ttl, max_entries: max_entries.max(1), entries: Mutex::new(HashMap::new()) }
	}

	pub fn get(&self, site_id: i64, microcosm_id: i64, profile_id: i64) -> Option<bool> {
		let mut entries = self.lock();
		let key = (site_id, microcosm_id, profile_id);
		let (can_read, stored_at) = entries.get(&key).copied()?;

		if stored_at.elapsed() >= self.ttl {
			entries.remove(&key);

			return None;
		}

		Some(can_read)
	}

	pub fn insert(&self, site_id: i64, microcosm_id: i64, profile_id: i64, can_read: bool) {
		let mut entries = self.lock();

		if entries.len() >= self.max_entries {
			let ttl = self.ttl;

			entries.retain(|_, (_, stored_at)| stored_at.elapsed() < ttl);

			if entries.len() >= self.max_entries {
				entries.clear();
			}
		}

		entries.insert((site_id, microcosm_id, profile_id), (can_read, Instant::now()));
	}

	pub fn len(&self) -> usize {
		self.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn lock(&self) -> MutexGuard<'_, HashMap<PermissionKey, (bool, Instant)>> {
		match self.entries.lock() {
			Ok(guard) => guard,
			Err(poisoned) => poisoned.into_inner(),
		}
	}
}

impl SearchService {
	/// Microcosms on the site the viewer may read and has not ignored.
	///
	/// A non-empty `filter` narrows the candidates first. Each remaining microcosm is
	/// resolved from the permission cache table, then this process's cache, and only then
	/// from the live permission collaborator.
	pub(crate) async fn visible_microcosms(
		&self,
		site_id: i64,
		viewer_id: i64,
		filter: &BTreeSet<i64>,
		now: OffsetDateTime,
	) -> Result<BTreeSet<i64>> {
		let mut candidates: BTreeSet<i64> = self
			.index
			.site_microcosm_ids(site_id)
			.await?
			.into_iter()
			.filter(|id| filter.is_empty() || filter.contains(id))
			.collect();

		if viewer_id > 0 {
			for ignored in self.index.ignored_microcosm_ids(viewer_id).await? {
				candidates.remove(&ignored);
			}
		}
		if candidates.is_empty() {
			return Ok(candidates);
		}

		let ids: Vec<i64> = candidates.iter().copied().collect();
		let mut visible = BTreeSet::new();

		for (microcosm_id, can_read) in
			self.index.cached_permissions(site_id, viewer_id, &ids, now).await?
		{
			if candidates.remove(&microcosm_id) && can_read {
				visible.insert(microcosm_id);
			}
		}

		let mut live_checks = 0_usize;

		for microcosm_id in candidates {
			let can_read = match self.permission_cache.get(site_id, microcosm_id, viewer_id) {
				Some(can_read) => can_read,
				None => {
					live_checks += 1;

					let can_read = self
						.providers
						.permissions
						.can_read(site_id, microcosm_id, viewer_id)
						.await
						.inspect_err(|err| {
							tracing::warn!(
								error = %err,
								site_id,
								microcosm_id,
								viewer_id,
								"Permission check failed."
							);
						})?;

					self.permission_cache.insert(site_id, microcosm_id, viewer_id, can_read);

					can_read
				},
			};

			if can_read {
				visible.insert(microcosm_id);
			}
		}

		tracing::debug!(
			site_id,
			viewer_id,
			visible = visible.len(),
			live_checks,
			"Resolved visible microcosms."
		);

		Ok(visible)
	}
}
