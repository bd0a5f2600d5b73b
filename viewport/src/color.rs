//! Color keys to display colors.
//!
//! The service reports every individual with an opaque color key (usually its
//! hex gene sequence). The viewport only needs a stable mapping from key to
//! color, so the resolver is a trait the host can replace.

use crate::components::Color;

pub trait ColorResolver: Send + Sync {
    fn resolve(&self, key: &str) -> Color;
}

impl<F> ColorResolver for F
where
    F: Fn(&str) -> Color + Send + Sync,
{
    fn resolve(&self, key: &str) -> Color {
        self(key)
    }
}

/// Classic string-hash coloring: a 32-bit rolling hash over UTF-16 code
/// units, low three bytes taken as red, green and blue.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashColor;

impl HashColor {
    fn hash(key: &str) -> i32 {
        key.encode_utf16().fold(0i32, |hash, unit| {
            i32::from(unit).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash))
        })
    }
}

impl ColorResolver for HashColor {
    fn resolve(&self, key: &str) -> Color {
        let bytes = Self::hash(key).to_le_bytes();
        Color::rgb(bytes[0], bytes[1], bytes[2])
    }
}
