use serde::{Deserialize, Serialize};

/// Closed taxonomy for classified resources. Anything the classifier returns
/// outside this list normalizes to [`ResourceType::Unknown`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
	Article,
	Video,
	Podcast,
	Tweet,
	Opinion,
	Insight,
	Story,
	Framework,
	Research,
	List,
	Tool,
	Announcement,
	#[serde(rename = "unknown_resource")]
	Unknown,
}

impl ResourceType {
	pub const ALL: [Self; 13] = [
		Self::Article,
		Self::Video,
		Self::Podcast,
		Self::Tweet,
		Self::Opinion,
		Self::Insight,
		Self::Story,
		Self::Framework,
		Self::Research,
		Self::List,
		Self::Tool,
		Self::Announcement,
		Self::Unknown,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Article => "article",
			Self::Video => "video",
			Self::Podcast => "podcast",
			Self::Tweet => "tweet",
			Self::Opinion => "opinion",
			Self::Insight => "insight",
			Self::Story => "story",
			Self::Framework => "framework",
			Self::Research => "research",
			Self::List => "list",
			Self::Tool => "tool",
			Self::Announcement => "announcement",
			Self::Unknown => "unknown_resource",
		}
	}

	/// Normalizes raw classifier output. Case-insensitive, tolerant of
	/// surrounding whitespace; unrecognized labels map to `Unknown`.
	pub fn parse(raw: &str) -> Self {
		let normalized = raw.trim().to_ascii_lowercase();

		Self::ALL
			.into_iter()
			.find(|candidate| candidate.as_str() == normalized)
			.unwrap_or(Self::Unknown)
	}
}

impl std::fmt::Display for ResourceType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
