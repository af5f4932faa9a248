//! Stable node coloring
//!
//! The same operation name gets the same color in every export, chosen
//! from a small crayon palette by hashing the name.

use sha2::{Digest, Sha256};

pub const CRAYON_COLORS: [&str; 10] = [
    "cornflowerblue",
    "lightcoral",
    "gold",
    "mediumseagreen",
    "orchid",
    "sandybrown",
    "plum",
    "turquoise",
    "khaki",
    "salmon",
];

/// Fill color for control/marker nodes (conditions, iterates, phis).
pub const NOTE_COLOR: &str = "cornsilk";

/// Pick a stable palette color for `name`.
///
/// The index is the SHA-256 digest read as a big-endian integer modulo the
/// palette size, folded byte by byte so no big-int arithmetic is needed.
pub fn color_for(name: &str) -> &'static str {
    let digest = Sha256::digest(name.as_bytes());
    let len = CRAYON_COLORS.len() as u32;
    let mut idx: u32 = 0;
    for byte in digest {
        idx = (idx * 256 + u32::from(byte)) % len;
    }
    CRAYON_COLORS[idx as usize]
}
