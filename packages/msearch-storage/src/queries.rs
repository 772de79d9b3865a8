use sqlx::Row;
use time::OffsetDateTime;

use msearch_domain::{ItemType, Page};

use crate::{
	Result,
	db::Db,
	models::{IndexedItem, Microcosm, ProfileRecord, SearchHit, SearchPage},
};

pub async fn site_microcosm_ids(db: &Db, site_id: i64) -> Result<Vec<i64>> {
	let ids = sqlx::query_scalar(
		"\
SELECT microcosm_id
FROM microcosms
WHERE site_id = $1 AND NOT is_deleted AND NOT is_moderated
ORDER BY microcosm_id",
	)
	.bind(site_id)
	.fetch_all(&db.pool)
	.await?;

	Ok(ids)
}

pub async fn ignored_microcosm_ids(db: &Db, profile_id: i64) -> Result<Vec<i64>> {
	if profile_id <= 0 {
		return Ok(Vec::new());
	}

	let ids = sqlx::query_scalar(
		"\
SELECT item_id
FROM ignores
WHERE profile_id = $1 AND item_type_id = $2
ORDER BY item_id",
	)
	.bind(profile_id)
	.bind(ItemType::Microcosm.id())
	.fetch_all(&db.pool)
	.await?;

	Ok(ids)
}

/// Unexpired rows of the permission cache for the given microcosms.
pub async fn cached_permissions(
	db: &Db,
	site_id: i64,
	profile_id: i64,
	microcosm_ids: &[i64],
	now: OffsetDateTime,
) -> Result<Vec<(i64, bool)>> {
	if microcosm_ids.is_empty() {
		return Ok(Vec::new());
	}

	let rows = sqlx::query(
		"\
SELECT microcosm_id, can_read
FROM permissions_cache
WHERE site_id = $1
	AND profile_id = $2
	AND microcosm_id = ANY($3)
	AND expires_at > $4",
	)
	.bind(site_id)
	.bind(profile_id)
	.bind(microcosm_ids.to_vec())
	.bind(now)
	.fetch_all(&db.pool)
	.await?;
	let mut out = Vec::with_capacity(rows.len());

	for row in rows {
		out.push((row.try_get("microcosm_id")?, row.try_get("can_read")?));
	}

	Ok(out)
}

/// Profiles on a site whose account email matches, most recently active first.
pub async fn profiles_by_email(
	db: &Db,
	site_id: i64,
	email: &str,
	page: Page,
) -> Result<SearchPage> {
	let total: i64 = sqlx::query_scalar(
		"\
SELECT COUNT(*)
FROM profiles p
JOIN users u ON u.user_id = p.user_id
WHERE p.site_id = $1 AND lower(u.email) = lower($2)",
	)
	.bind(site_id)
	.bind(email)
	.fetch_one(&db.pool)
	.await?;

	if total == 0 || page.offset >= total {
		return Ok(SearchPage { total, hits: Vec::new() });
	}

	let rows = sqlx::query(
		"\
SELECT p.profile_id, p.last_active
FROM profiles p
JOIN users u ON u.user_id = p.user_id
WHERE p.site_id = $1 AND lower(u.email) = lower($2)
ORDER BY p.last_active DESC, p.profile_id ASC
LIMIT $3 OFFSET $4",
	)
	.bind(site_id)
	.bind(email)
	.bind(page.limit)
	.bind(page.offset)
	.fetch_all(&db.pool)
	.await?;
	let mut hits = Vec::with_capacity(rows.len());

	for row in rows {
		hits.push(profile_hit(row.try_get("profile_id")?, row.try_get("last_active")?));
	}

	Ok(SearchPage { total, hits })
}

pub(crate) fn profile_hit(profile_id: i64, last_active: OffsetDateTime) -> SearchHit {
	SearchHit {
		item_type: ItemType::Profile,
		item_id: profile_id,
		parent_item_type: None,
		parent_item_id: None,
		last_modified: last_active,
		rank: 1.0,
		highlight: String::new(),
		unread: false,
	}
}

/// Writes the flag record, the text index row and, for events, the event time.
pub async fn index_item(db: &Db, item: &IndexedItem, text_search_config: &str) -> Result<()> {
	let mut tx = db.pool.begin().await?;

	sqlx::query(
		"\
INSERT INTO flags (
	site_id,
	item_type_id,
	item_id,
	microcosm_id,
	parent_item_type_id,
	parent_item_id,
	parent_microcosm_id,
	created_by,
	last_modified,
	has_attachment,
	item_is_deleted,
	item_is_moderated,
	parent_is_deleted,
	parent_is_moderated,
	microcosm_is_deleted,
	microcosm_is_moderated
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
ON CONFLICT (item_type_id, item_id) DO UPDATE
SET
	site_id = EXCLUDED.site_id,
	microcosm_id = EXCLUDED.microcosm_id,
	parent_item_type_id = EXCLUDED.parent_item_type_id,
	parent_item_id = EXCLUDED.parent_item_id,
	parent_microcosm_id = EXCLUDED.parent_microcosm_id,
	created_by = EXCLUDED.created_by,
	last_modified = EXCLUDED.last_modified,
	has_attachment = EXCLUDED.has_attachment,
	item_is_deleted = EXCLUDED.item_is_deleted,
	item_is_moderated = EXCLUDED.item_is_moderated,
	parent_is_deleted = EXCLUDED.parent_is_deleted,
	parent_is_moderated = EXCLUDED.parent_is_moderated,
	microcosm_is_deleted = EXCLUDED.microcosm_is_deleted,
	microcosm_is_moderated = EXCLUDED.microcosm_is_moderated",
	)
	.bind(item.site_id)
	.bind(item.item_type.id())
	.bind(item.item_id)
	.bind(item.microcosm_id)
	.bind(item.parent_item_type.map(ItemType::id))
	.bind(item.parent_item_id)
	.bind(item.parent_microcosm_id)
	.bind(item.author_id)
	.bind(item.last_modified)
	.bind(item.has_attachment)
	.bind(item.moderation.item_deleted)
	.bind(item.moderation.item_moderated)
	.bind(item.moderation.parent_deleted)
	.bind(item.moderation.parent_moderated)
	.bind(item.moderation.microcosm_deleted)
	.bind(item.moderation.microcosm_moderated)
	.execute(&mut *tx)
	.await?;
	sqlx::query(
		"\
INSERT INTO search_index (
	site_id,
	item_type_id,
	item_id,
	title_text,
	document_text,
	title_vector,
	document_vector,
	last_modified
)
VALUES ($1, $2, $3, $4, $5, to_tsvector($6::regconfig, $4), to_tsvector($6::regconfig, $5), $7)
ON CONFLICT (item_type_id, item_id) DO UPDATE
SET
	site_id = EXCLUDED.site_id,
	title_text = EXCLUDED.title_text,
	document_text = EXCLUDED.document_text,
	title_vector = EXCLUDED.title_vector,
	document_vector = EXCLUDED.document_vector,
	last_modified = EXCLUDED.last_modified",
	)
	.bind(item.site_id)
	.bind(item.item_type.id())
	.bind(item.item_id)
	.bind(item.title.as_str())
	.bind(item.document())
	.bind(text_search_config)
	.bind(item.last_modified)
	.execute(&mut *tx)
	.await?;

	if item.item_type == ItemType::Event {
		sqlx::query(
			"\
INSERT INTO events (event_id, event_when)
VALUES ($1, $2)
ON CONFLICT (event_id) DO UPDATE
SET event_when = EXCLUDED.event_when",
		)
		.bind(item.item_id)
		.bind(item.event_time)
		.execute(&mut *tx)
		.await?;
	}

	tx.commit().await?;

	Ok(())
}

pub async fn upsert_microcosm(db: &Db, microcosm: &Microcosm) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO microcosms (microcosm_id, site_id, title, is_deleted)
VALUES ($1, $2, '', $3)
ON CONFLICT (microcosm_id) DO UPDATE
SET site_id = EXCLUDED.site_id, is_deleted = EXCLUDED.is_deleted",
	)
	.bind(microcosm.microcosm_id)
	.bind(microcosm.site_id)
	.bind(microcosm.deleted)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn upsert_permission(
	db: &Db,
	site_id: i64,
	microcosm_id: i64,
	profile_id: i64,
	can_read: bool,
	expires_at: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO permissions_cache (site_id, microcosm_id, profile_id, can_read, expires_at)
VALUES ($1, $2, $3, $4, $5)
ON CONFLICT (site_id, microcosm_id, profile_id) DO UPDATE
SET can_read = EXCLUDED.can_read, expires_at = EXCLUDED.expires_at",
	)
	.bind(site_id)
	.bind(microcosm_id)
	.bind(profile_id)
	.bind(can_read)
	.bind(expires_at)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn add_ignore(
	db: &Db,
	profile_id: i64,
	item_type: ItemType,
	item_id: i64,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO ignores (profile_id, item_type_id, item_id)
VALUES ($1, $2, $3)
ON CONFLICT DO NOTHING",
	)
	.bind(profile_id)
	.bind(item_type.id())
	.bind(item_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn add_huddle_participant(db: &Db, huddle_id: i64, profile_id: i64) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO huddle_profiles (huddle_id, profile_id)
VALUES ($1, $2)
ON CONFLICT DO NOTHING",
	)
	.bind(huddle_id)
	.bind(profile_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn add_watcher(
	db: &Db,
	profile_id: i64,
	item_type: ItemType,
	item_id: i64,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO watchers (profile_id, item_type_id, item_id)
VALUES ($1, $2, $3)
ON CONFLICT DO NOTHING",
	)
	.bind(profile_id)
	.bind(item_type.id())
	.bind(item_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn add_attendee(db: &Db, event_id: i64, profile_id: i64) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO attendees (event_id, profile_id, attending)
VALUES ($1, $2, true)
ON CONFLICT (event_id, profile_id) DO UPDATE
SET attending = true",
	)
	.bind(event_id)
	.bind(profile_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn mark_read(
	db: &Db,
	profile_id: i64,
	item_type: ItemType,
	item_id: i64,
	read_at: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO read_markers (profile_id, item_type_id, item_id, read_at)
VALUES ($1, $2, $3, $4)
ON CONFLICT (profile_id, item_type_id, item_id) DO UPDATE
SET read_at = GREATEST(read_markers.read_at, EXCLUDED.read_at)",
	)
	.bind(profile_id)
	.bind(item_type.id())
	.bind(item_id)
	.bind(read_at)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn upsert_profile(db: &Db, profile: &ProfileRecord) -> Result<()> {
	let mut tx = db.pool.begin().await?;

	sqlx::query(
		"\
INSERT INTO users (user_id, email)
VALUES ($1, $2)
ON CONFLICT (user_id) DO UPDATE
SET email = EXCLUDED.email",
	)
	.bind(profile.user_id)
	.bind(profile.email.as_str())
	.execute(&mut *tx)
	.await?;
	sqlx::query(
		"\
INSERT INTO profiles (profile_id, site_id, user_id, profile_name, last_active)
VALUES ($1, $2, $3, $4, $5)
ON CONFLICT (profile_id) DO UPDATE
SET
	site_id = EXCLUDED.site_id,
	user_id = EXCLUDED.user_id,
	profile_name = EXCLUDED.profile_name,
	last_active = EXCLUDED.last_active",
	)
	.bind(profile.profile_id)
	.bind(profile.site_id)
	.bind(profile.user_id)
	.bind(profile.profile_name.as_str())
	.bind(profile.last_active)
	.execute(&mut *tx)
	.await?;

	tx.commit().await?;

	Ok(())
}
