pub fn render_schema() -> String {
	let init = include_str!("../../../sql/init.sql");

	expand_includes(init)
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"00_extensions.sql" => out.push_str(include_str!("../../../sql/00_extensions.sql")),
				"tables/001_users.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_users.sql")),
				"tables/002_messages.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_messages.sql")),
				"tables/003_resources.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_resources.sql")),
				"tables/004_subresources.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_subresources.sql")),
				"tables/005_processing_queue.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_processing_queue.sql")),
				"tables/006_ai_enrichments.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_ai_enrichments.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}
