use std::fmt;

use serde::{Serialize, Serializer};

pub const PATH_SEPARATOR: &str = " > ";

/// Chain of category names from the top-level category down to the category
/// that holds a product. Rendered and serialized as `"Top > Sub > Leaf"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct CategoryPath(Vec<String>);

impl CategoryPath {
    pub fn root(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.into());
        Self(segments)
    }

    /// Splits a rendered path. Segments are trimmed and empty ones dropped.
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split('>')
                .map(str::trim)
                .filter(|segment| !segment.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn top_level(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Segments below the top-level category.
    pub fn nested(&self) -> &[String] {
        self.0.get(1..).unwrap_or_default()
    }

    pub fn leaf(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CategoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(PATH_SEPARATOR))
    }
}

impl Serialize for CategoryPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
