use crate::item_type::Lexicon;

/// Extracts hashtags the same way inline content linking does: `#` followed by word
/// characters, at the start of the text or after whitespace, and not purely numeric.
///
/// Tags are returned lowercased, without the `#`, in first-seen order.
pub fn extract_hashtags(lexicon: &Lexicon, text: &str) -> Vec<String> {
	let mut tags: Vec<String> = Vec::new();

	for captures in lexicon.hashtag_regex().captures_iter(text) {
		let Some(tag) = captures.get(1).map(|m| m.as_str()) else {
			continue;
		};

		if tag.chars().all(|c| c.is_ascii_digit()) {
			continue;
		}

		let tag = tag.to_lowercase();

		if !tags.contains(&tag) {
			tags.push(tag);
		}
	}

	tags
}
