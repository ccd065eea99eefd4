//! Hierarchical identifier model shared by every component that needs to
//! derive an emitted symbol or a fully-qualified dotted path from a schema
//! element.

use std::fmt;
use std::ops::Add;

/// An ordered sequence of identifier segments.
///
/// A `Name` is immutable once built; every component that needs a deeper
/// name composes a new one rather than mutating an existing value. This
/// mirrors how schema paths are built top-down as the descriptor tree is
/// walked.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    segments: Vec<String>,
}

impl Name {
    /// An empty name.
    pub fn new() -> Self {
        Name {
            segments: Vec::new(),
        }
    }

    /// Builds a name from a single segment.
    pub fn from_segment(segment: impl Into<String>) -> Self {
        Name {
            segments: vec![segment.into()],
        }
    }

    /// Builds a name directly from a segment list.
    pub fn from_segments(segments: Vec<String>) -> Self {
        Name { segments }
    }

    /// Splits a dotted path (e.g. `.pkg.Foo.Bar` or `pkg.Foo.Bar`) into a
    /// `Name`, discarding a leading empty segment produced by a leading dot.
    pub fn from_dotted(path: &str) -> Self {
        let segments = path
            .split('.')
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        Name { segments }
    }

    /// Returns the individual segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// `true` if this name has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The last segment, if any.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Renders as an underscore-joined identifier, suitable for use as a
    /// C symbol.
    pub fn as_ident(&self) -> String {
        self.segments.join("_")
    }

    /// Renders as a dot-joined fully qualified name.
    pub fn as_qualified(&self) -> String {
        self.segments.join(".")
    }

    /// Returns only the final segment as its own `Name`, losing all nesting.
    /// Used by the `FLATTEN` mangling policy.
    pub fn flatten(&self) -> Name {
        match self.last() {
            Some(s) => Name::from_segment(s),
            None => Name::new(),
        }
    }

    /// Returns a string built from the first character of each segment,
    /// concatenated in order. Used by the `PACKAGE_INITIALS` mangling
    /// policy to turn a package path into a short symbol prefix.
    pub fn initials(&self) -> String {
        self.segments
            .iter()
            .filter_map(|s| s.chars().next())
            .collect()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_ident())
    }
}

impl Add<&str> for Name {
    type Output = Name;

    fn add(mut self, rhs: &str) -> Name {
        if !rhs.is_empty() {
            self.segments.push(rhs.to_owned());
        }
        self
    }
}

impl Add<&Name> for Name {
    type Output = Name;

    fn add(mut self, rhs: &Name) -> Name {
        self.segments.extend(rhs.segments.iter().cloned());
        self
    }
}

impl Add<Name> for Name {
    type Output = Name;

    fn add(self, rhs: Name) -> Name {
        self.add(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_segments() {
        let n = Name::from_segment("Outer") + "Inner";
        assert_eq!(n.as_ident(), "Outer_Inner");
        assert_eq!(n.as_qualified(), "Outer.Inner");
    }

    #[test]
    fn from_dotted_drops_leading_empty_segment() {
        let n = Name::from_dotted(".pkg.Foo.Bar");
        assert_eq!(n.segments(), &["pkg", "Foo", "Bar"]);
    }

    #[test]
    fn flatten_keeps_only_last_segment() {
        let n = Name::from_dotted("pkg.Foo.Bar");
        assert_eq!(n.flatten().as_ident(), "Bar");
    }

    #[test]
    fn initials_takes_first_char_of_each_segment() {
        let n = Name::from_dotted("my.cool.package");
        assert_eq!(n.initials(), "mcp");
    }

    #[test]
    fn add_name_extends_segments() {
        let a = Name::from_segment("A");
        let b = Name::from_segment("B") + "C";
        assert_eq!((a + &b).as_ident(), "A_B_C");
    }
}
