pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_flags.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_flags.sql")),
				"tables/002_search_index.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_search_index.sql")),
				"tables/003_microcosms.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_microcosms.sql")),
				"tables/004_permissions_cache.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_permissions_cache.sql")),
				"tables/005_ignores.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_ignores.sql")),
				"tables/006_huddle_profiles.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_huddle_profiles.sql")),
				"tables/007_watchers.sql" =>
					out.push_str(include_str!("../../../sql/tables/007_watchers.sql")),
				"tables/008_events.sql" =>
					out.push_str(include_str!("../../../sql/tables/008_events.sql")),
				"tables/009_attendees.sql" =>
					out.push_str(include_str!("../../../sql/tables/009_attendees.sql")),
				"tables/010_read_markers.sql" =>
					out.push_str(include_str!("../../../sql/tables/010_read_markers.sql")),
				"tables/011_profiles.sql" =>
					out.push_str(include_str!("../../../sql/tables/011_profiles.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use crate::schema::render_schema;

	#[test]
	fn includes_are_expanded() {
		let sql = render_schema();

		assert!(!sql.contains("\\ir "));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS flags"));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS read_markers"));
	}
}
