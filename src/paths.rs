//! Dotted element paths used to point at locations inside blueprint elements.
use std::{fmt, slice::Iter};

/// A property name or array index within an element path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathChunk {
    /// Field name within an object or map.
    Property(Box<str>),
    /// Index within an array.
    Index(usize),
}

/// A path from a blueprint element down into its mapping tree, rendered in
/// the dotted form blueprint authors use: `resources.orders.spec.tags[0]`.
///
/// The primary purpose of this type is to build error messages incrementally
/// without formatting indexes until display time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementPath(Vec<PathChunk>);

impl ElementPath {
    #[must_use]
    pub const fn new() -> ElementPath {
        ElementPath(Vec::new())
    }

    /// Start a path at a named element, e.g. `resources.orders`.
    #[must_use]
    pub fn root(section: &str, name: &str) -> ElementPath {
        ElementPath(vec![
            PathChunk::Property(section.into()),
            PathChunk::Property(name.into()),
        ])
    }

    /// A copy of this path with one more chunk appended.
    #[must_use]
    pub fn child(&self, chunk: impl Into<PathChunk>) -> ElementPath {
        let mut path = self.clone();
        path.0.push(chunk.into());
        path
    }

    pub fn iter(&self) -> Iter<'_, PathChunk> {
        self.0.iter()
    }

    #[must_use]
    pub fn last(&self) -> Option<&PathChunk> {
        self.0.last()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, chunk) in self.0.iter().enumerate() {
            match chunk {
                PathChunk::Property(name) => {
                    if idx > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                PathChunk::Index(index) => {
                    f.write_str("[")?;
                    f.write_str(itoa::Buffer::new().format(*index))?;
                    f.write_str("]")?;
                }
            }
        }
        Ok(())
    }
}

impl serde::Serialize for ElementPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl From<String> for PathChunk {
    #[inline]
    fn from(value: String) -> PathChunk {
        PathChunk::Property(value.into_boxed_str())
    }
}

impl From<&str> for PathChunk {
    #[inline]
    fn from(value: &str) -> PathChunk {
        PathChunk::Property(value.into())
    }
}

impl From<usize> for PathChunk {
    #[inline]
    fn from(value: usize) -> PathChunk {
        PathChunk::Index(value)
    }
}
