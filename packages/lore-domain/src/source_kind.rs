use serde::{Deserialize, Serialize};

/// How a resource entered the pipeline. Links go through the web extractor;
/// documents and images are read through the OCR provider instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
	Link,
	Document,
	Image,
}

impl SourceKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Link => "link",
			Self::Document => "document",
			Self::Image => "image",
		}
	}

	/// Normalizes the stored column value. Unrecognized values read as `Link`,
	/// matching the column default.
	pub fn parse(raw: &str) -> Self {
		match raw.trim().to_ascii_lowercase().as_str() {
			"document" => Self::Document,
			"image" => Self::Image,
			_ => Self::Link,
		}
	}
}

impl std::fmt::Display for SourceKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
