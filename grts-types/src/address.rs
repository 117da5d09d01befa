use serde::{Deserialize, Serialize};
use std::fmt;

/// Base-4 hierarchical address of a quadrant.
///
/// Each split appends one digit to the parent's address:
/// `0` lower-left, `1` upper-left, `2` lower-right, `3` upper-right.
/// Lexicographic order over addresses walks the grid along a Morton-like
/// curve, which is what systematic GRTS sampling relies on.
///
/// # Examples
///
/// ```
/// use grts_types::address::QuadAddress;
///
/// let a = QuadAddress::root().child(0).child(3);
/// let b = QuadAddress::root().child(1).child(0);
/// assert_eq!(a.depth(), 2);
/// assert!(a < b);
/// assert_eq!(QuadAddress::parse("103"), Some(QuadAddress::root().child(1).child(0).child(3)));
/// assert_eq!(QuadAddress::parse("14"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuadAddress(String);

impl QuadAddress {
    /// Address of the initial, unsplit quadrant.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Parse an address, rejecting any digit outside `0..=3`.
    pub fn parse(s: &str) -> Option<Self> {
        if s.bytes().all(|b| (b'0'..=b'3').contains(&b)) {
            Some(Self(s.to_string()))
        } else {
            None
        }
    }

    /// Address of child `index` of this quadrant.
    ///
    /// # Panics
    ///
    /// Panics if `index > 3`.
    pub fn child(&self, index: u8) -> Self {
        assert!(index < 4, "quadrant child index must be in 0..=3");
        let mut s = String::with_capacity(self.0.len() + 1);
        s.push_str(&self.0);
        s.push(char::from(b'0' + index));
        Self(s)
    }

    /// Number of splits that produced this quadrant.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Address of the parent quadrant, `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_string()))
        }
    }

    /// Whether `self` is `other` or one of its descendants.
    pub fn starts_with(&self, other: &QuadAddress) -> bool {
        self.0.starts_with(&other.0)
    }
}

impl fmt::Display for QuadAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
