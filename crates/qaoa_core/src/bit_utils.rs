//! Conversion between basis labels and LSB-first bit patterns.
//!
//! A basis index `k` of an `n`-qubit register encodes one vertex coloring of
//! an `n`-vertex graph: bit `i` of `k` (i.e. `(k >> i) & 1`) is the color of
//! vertex `i`. Decoding and encoding both follow this convention so that cost
//! values computed from decoded colorings line up with amplitude indices.

use crate::{QaoaError, Result};
use bitvec::prelude::*;

/// Bit pattern of one basis label, vertex 0 in position 0.
pub type Coloring = BitVec<u64, Lsb0>;

pub struct BitCodec;

impl BitCodec {
    /// Widest label the codec can represent.
    pub const MAX_WIDTH: usize = u64::BITS as usize;

    /// Decodes `k` into a freshly allocated bit vector of `width` bits.
    ///
    /// # Errors
    ///
    /// `RangeError` if `width` exceeds 64 bits or `k >= 2^width`.
    pub fn decode_to_bits(k: u64, width: usize) -> Result<Coloring> {
        if width > Self::MAX_WIDTH {
            return Err(QaoaError::range("bit width", width, Self::MAX_WIDTH));
        }
        let mut bits = bitvec![u64, Lsb0; 0; width];
        Self::decode_into(k, &mut bits)?;
        Ok(bits)
    }

    /// Decodes `k` into an existing buffer; the buffer length is the width.
    ///
    /// Used in hot loops with a per-worker scratch buffer so that decoding
    /// performs no allocation.
    #[inline]
    pub fn decode_into(k: u64, bits: &mut BitSlice<u64, Lsb0>) -> Result<()> {
        let width = bits.len();
        if width > Self::MAX_WIDTH {
            return Err(QaoaError::range("bit width", width, Self::MAX_WIDTH));
        }
        if width < Self::MAX_WIDTH && k >> width != 0 {
            return Err(QaoaError::range("basis label", k, format!("2^{width}")));
        }
        for pos in 0..width {
            bits.set(pos, (k >> pos) & 1 == 1);
        }
        Ok(())
    }

    /// Encodes a bit pattern back into its integer label: `sum(bits[i] * 2^i)`.
    pub fn encode_from_bits(bits: &BitSlice<u64, Lsb0>) -> Result<u64> {
        if bits.len() > Self::MAX_WIDTH {
            return Err(QaoaError::range("bit width", bits.len(), Self::MAX_WIDTH));
        }
        Ok(bits.iter_ones().fold(0u64, |acc, pos| acc | (1u64 << pos)))
    }

    /// Remaps a `{0,1}` pattern to `{-1,+1}` spins in `spins`.
    #[inline]
    pub fn to_spins(bits: &BitSlice<u64, Lsb0>, spins: &mut [i64]) -> Result<()> {
        if bits.len() != spins.len() {
            return Err(QaoaError::SizeMismatch {
                what: "spin buffer",
                expected: bits.len(),
                found: spins.len(),
            });
        }
        for (spin, bit) in spins.iter_mut().zip(bits.iter().by_vals()) {
            *spin = if bit { 1 } else { -1 };
        }
        Ok(())
    }

    /// Renders `k` as a string of `width` characters, vertex 0 first.
    pub fn format(k: u64, width: usize) -> Result<String> {
        let bits = Self::decode_to_bits(k, width)?;
        Ok(bits
            .iter()
            .by_vals()
            .map(|b| if b { '1' } else { '0' })
            .collect())
    }
}
