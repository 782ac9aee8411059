//! Content Hashing
//!
//! Every cache in the translation layer is keyed by a 128-bit xxh3 digest of
//! the *content* of what it stores. Floats are hashed by bit pattern and
//! variable-length items are length-prefixed, so structurally different
//! inputs never collide through concatenation.

use std::fmt;

use glam::{Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::Xxh3;

/// A 128-bit content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Hash128(pub u128);

impl fmt::Display for Hash128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Streaming xxh3-128 hasher.
pub struct ContentHasher {
    inner: Xxh3,
}

impl fmt::Debug for ContentHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentHasher")
            .field("digest", &self.finish())
            .finish()
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentHasher {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Xxh3::new() }
    }

    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    #[inline]
    pub fn write_u8(&mut self, v: u8) {
        self.inner.update(&[v]);
    }

    #[inline]
    pub fn write_u32(&mut self, v: u32) {
        self.inner.update(&v.to_le_bytes());
    }

    #[inline]
    pub fn write_u64(&mut self, v: u64) {
        self.inner.update(&v.to_le_bytes());
    }

    #[inline]
    pub fn write_i32(&mut self, v: i32) {
        self.inner.update(&v.to_le_bytes());
    }

    #[inline]
    pub fn write_f32(&mut self, v: f32) {
        self.write_u32(v.to_bits());
    }

    #[inline]
    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    #[inline]
    pub fn write_usize(&mut self, v: usize) {
        self.write_u64(v as u64);
    }

    /// Length-prefixed string.
    pub fn write_str(&mut self, s: &str) {
        self.write_usize(s.len());
        self.inner.update(s.as_bytes());
    }

    pub fn write_hash(&mut self, h: Hash128) {
        self.inner.update(&h.0.to_le_bytes());
    }

    /// Hashes any [`ContentHash`] value into this hasher.
    pub fn append<T: ContentHash + ?Sized>(&mut self, value: &T) {
        value.hash_into(self);
    }

    #[must_use]
    pub fn finish(&self) -> Hash128 {
        Hash128(self.inner.digest128())
    }
}

/// Types that can contribute their content to a [`ContentHasher`].
pub trait ContentHash {
    fn hash_into(&self, hasher: &mut ContentHasher);

    /// Convenience: hash `self` alone.
    fn content_hash(&self) -> Hash128 {
        let mut h = ContentHasher::new();
        self.hash_into(&mut h);
        h.finish()
    }
}

impl ContentHash for bool {
    fn hash_into(&self, hasher: &mut ContentHasher) {
        hasher.write_bool(*self);
    }
}

impl ContentHash for i32 {
    fn hash_into(&self, hasher: &mut ContentHasher) {
        hasher.write_i32(*self);
    }
}

impl ContentHash for u32 {
    fn hash_into(&self, hasher: &mut ContentHasher) {
        hasher.write_u32(*self);
    }
}

impl ContentHash for f32 {
    fn hash_into(&self, hasher: &mut ContentHasher) {
        hasher.write_f32(*self);
    }
}

impl ContentHash for str {
    fn hash_into(&self, hasher: &mut ContentHasher) {
        hasher.write_str(self);
    }
}

impl ContentHash for String {
    fn hash_into(&self, hasher: &mut ContentHasher) {
        hasher.write_str(self);
    }
}

impl ContentHash for Hash128 {
    fn hash_into(&self, hasher: &mut ContentHasher) {
        hasher.write_hash(*self);
    }
}

impl ContentHash for Vec2 {
    fn hash_into(&self, hasher: &mut ContentHasher) {
        for c in self.to_array() {
            hasher.write_f32(c);
        }
    }
}

impl ContentHash for Vec3 {
    fn hash_into(&self, hasher: &mut ContentHasher) {
        for c in self.to_array() {
            hasher.write_f32(c);
        }
    }
}

impl ContentHash for Vec4 {
    fn hash_into(&self, hasher: &mut ContentHasher) {
        for c in self.to_array() {
            hasher.write_f32(c);
        }
    }
}

impl ContentHash for Mat4 {
    fn hash_into(&self, hasher: &mut ContentHasher) {
        for c in self.to_cols_array() {
            hasher.write_f32(c);
        }
    }
}

impl<T: ContentHash> ContentHash for [T] {
    fn hash_into(&self, hasher: &mut ContentHasher) {
        hasher.write_usize(self.len());
        for v in self {
            v.hash_into(hasher);
        }
    }
}

impl<T: ContentHash> ContentHash for Vec<T> {
    fn hash_into(&self, hasher: &mut ContentHasher) {
        self.as_slice().hash_into(hasher);
    }
}

impl<T: ContentHash> ContentHash for Option<T> {
    fn hash_into(&self, hasher: &mut ContentHasher) {
        match self {
            Some(v) => {
                hasher.write_u8(1);
                v.hash_into(hasher);
            }
            None => hasher.write_u8(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_content_equal_hash() {
        let a = vec![1.0f32, 2.0, 3.0].content_hash();
        let b = vec![1.0f32, 2.0, 3.0].content_hash();
        assert_eq!(a, b);
    }

    #[test]
    fn test_length_prefix_prevents_concatenation_collisions() {
        let mut h1 = ContentHasher::new();
        h1.append("ab");
        h1.append("c");
        let mut h2 = ContentHasher::new();
        h2.append("a");
        h2.append("bc");
        assert_ne!(h1.finish(), h2.finish());
    }

    #[test]
    fn test_option_none_differs_from_some() {
        assert_ne!(None::<i32>.content_hash(), Some(0).content_hash());
    }
}
