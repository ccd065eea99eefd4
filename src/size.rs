//! Symbolic encoded-size algebra.
//!
//! Field and message sizes are not always known at generation time (a field
//! may depend on the size of a message defined in another file that is still
//! being processed). `EncodedSize` represents a worst-case byte count as a
//! constant plus a sum of opaque symbolic terms, so computation can proceed
//! without knowing every dependency's final numeric size.

use std::fmt;
use std::ops::{Add, Mul};

/// A worst-case encoded byte count: `constant + term_0 + term_1 + ...`.
///
/// Terms are kept as their rendered text, never algebraically simplified
/// against each other; only the constant part is folded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncodedSize {
    constant: u32,
    terms: Vec<String>,
}

impl EncodedSize {
    /// A size of exactly zero.
    pub fn zero() -> Self {
        EncodedSize::default()
    }

    /// A purely numeric size.
    pub fn constant(value: u32) -> Self {
        EncodedSize {
            constant: value,
            terms: Vec::new(),
        }
    }

    /// A single opaque symbolic term, e.g. `"Foo_size"`.
    pub fn symbol(term: impl Into<String>) -> Self {
        EncodedSize {
            constant: 0,
            terms: vec![term.into()],
        }
    }

    /// Adds a numeric constant in place.
    pub fn add_constant(&mut self, value: u32) {
        self.constant = self.constant.saturating_add(value);
    }

    /// Adds an opaque symbolic term in place.
    pub fn add_symbol(&mut self, term: impl Into<String>) {
        self.terms.push(term.into());
    }

    /// `true` if this size carries no symbolic terms.
    pub fn is_numeric(&self) -> bool {
        self.terms.is_empty()
    }

    /// The constant part alone.
    pub fn constant_part(&self) -> u32 {
        self.constant
    }

    /// The symbolic terms alone.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Renders the size as C expression text: a bare integer if purely
    /// numeric, otherwise a parenthesized sum.
    pub fn render(&self) -> String {
        if self.terms.is_empty() {
            return self.constant.to_string();
        }
        let mut parts = Vec::with_capacity(self.terms.len() + 1);
        if self.constant != 0 || self.terms.is_empty() {
            parts.push(self.constant.to_string());
        }
        parts.extend(self.terms.iter().cloned());
        format!("({})", parts.join(" + "))
    }

    /// A conservative upper bound: the constant itself when no symbolic
    /// terms are present, otherwise `u32::MAX`.
    pub fn upper_limit(&self) -> u32 {
        if self.terms.is_empty() {
            self.constant
        } else {
            u32::MAX
        }
    }
}

impl fmt::Display for EncodedSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl Add for EncodedSize {
    type Output = EncodedSize;

    fn add(mut self, rhs: EncodedSize) -> EncodedSize {
        self.constant = self.constant.saturating_add(rhs.constant);
        self.terms.extend(rhs.terms);
        self
    }
}

impl Mul<u32> for EncodedSize {
    type Output = EncodedSize;

    /// Distributes the multiplier into both the constant and each term,
    /// rewriting `term` as `"k*term"`.
    fn mul(self, rhs: u32) -> EncodedSize {
        let constant = self.constant.saturating_mul(rhs);
        let terms = self
            .terms
            .into_iter()
            .map(|t| format!("{}*{}", rhs, t))
            .collect();
        EncodedSize { constant, terms }
    }
}

/// Returns the number of bytes a varint encoding of `value` occupies.
///
/// Negative values are treated as their 64-bit two's-complement magnitude
/// rather than reinterpreted as a smaller unsigned quantity: every negative
/// `i64` costs the full 10 bytes, matching how a real varint encoder handles
/// a negative value assigned to a signed proto field without `sint32`/`sint64`
/// zig-zag encoding.
pub fn varint_size(value: i64) -> u8 {
    // Reinterpreting the bit pattern as u64 is exactly the 64-bit
    // two's-complement magnitude for negative inputs, so every negative
    // value costs the full 10-byte varint encoding.
    let mut remaining = value as u64;
    let mut size: u8 = 1;
    while remaining >= 0x80 {
        remaining >>= 7;
        size += 1;
    }
    size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_size_matches_reference_vectors() {
        assert_eq!(varint_size(-1), 10);
        assert_eq!(varint_size(0), 1);
        assert_eq!(varint_size(127), 1);
        assert_eq!(varint_size(128), 2);
    }

    #[test]
    fn numeric_sizes_add_and_multiply() {
        let a = EncodedSize::constant(3);
        let b = EncodedSize::constant(4);
        assert_eq!((a + b).render(), "7");

        let c = EncodedSize::constant(5) * 3;
        assert_eq!(c.render(), "15");
    }

    #[test]
    fn symbolic_sizes_render_as_sum() {
        let mut s = EncodedSize::constant(2);
        s.add_symbol("Foo_size");
        assert_eq!(s.render(), "(2 + Foo_size)");
        assert_eq!(s.upper_limit(), u32::MAX);
    }

    #[test]
    fn multiply_distributes_into_symbolic_terms() {
        let s = EncodedSize::symbol("Foo_size") * 4;
        assert_eq!(s.render(), "(4*Foo_size)");
    }

    #[test]
    fn numeric_only_upper_limit_is_constant() {
        assert_eq!(EncodedSize::constant(42).upper_limit(), 42);
    }
}
