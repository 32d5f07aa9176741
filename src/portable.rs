//! Generic-width window kernels.
//!
//! These run on every target and define the lane logic the hand-vectorized
//! back-ends in `simd` reproduce. Each window is reduced to `u64` lane masks,
//! so `W` may be anything from 1 to 64.

use crate::{scalar, Endian};

/// Bits `0..len` set.
#[inline(always)]
const fn lane_mask(len: usize) -> u64 {
    if len >= 64 { !0 } else { (1u64 << len) - 1 }
}

// ======================================================================
// UTF-16 Repair
// ======================================================================

/// Per-position faults of one repair window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct WindowFaults {
    /// The lookback unit is a high surrogate not followed by a low surrogate.
    pub lookback: bool,
    /// Bit `k` set: unit `k` of the window must be replaced.
    pub block: u64,
}

impl WindowFaults {
    #[inline(always)]
    pub fn is_clean(&self) -> bool {
        !self.lookback && self.block == 0
    }
}

/// Classifies every pair `(prev, unit)` of the window extended by its lookback.
///
/// A high surrogate in the last lane is not judged here: its successor is
/// lane 0 of the next window, which reports it through `lookback`.
#[inline(always)]
pub(crate) fn utf16_window_faults<E: Endian, const W: usize>(lookback: u16, block: &[u16; W]) -> WindowFaults {
    let mut prev_is_high = 0u64;
    let mut is_low = 0u64;
    let mut prev = lookback;

    for (k, &unit) in block.iter().enumerate() {
        prev_is_high |= (scalar::is_high_surrogate::<E>(prev) as u64) << k;
        is_low |= (scalar::is_low_surrogate::<E>(unit) as u64) << k;
        prev = unit;
    }

    if prev_is_high ^ is_low == 0 {
        return WindowFaults::default();
    }

    // Bit k of `orphan_high` blames unit k-1; move it back one lane.
    let orphan_high = prev_is_high & !is_low;
    let orphan_low = is_low & !prev_is_high;

    WindowFaults {
        lookback: orphan_high & 1 != 0,
        block: (orphan_high >> 1) | orphan_low,
    }
}

/// Repairs `dst[0..W]` from `src[-1..W]`, and `dst[-1]` if the lookback is orphaned.
///
/// # Safety
/// `src` must be valid for reads of `src[-1..W]`, `dst` for writes of `dst[-1..W]`.
#[inline(always)]
unsafe fn utf16_fix_window<E: Endian, const W: usize, const IN_PLACE: bool>(src: *const u16, dst: *mut u16) {
    let (lookback, block) = unsafe { (src.sub(1).read(), (src as *const [u16; W]).read()) };
    let faults = utf16_window_faults::<E, W>(lookback, &block);

    if faults.is_clean() {
        if !IN_PLACE {
            unsafe { (dst as *mut [u16; W]).write(block) };
        }
        return;
    }

    if faults.lookback {
        unsafe { dst.sub(1).write(E::REPLACEMENT) };
    }

    let mut fixed = block;
    for (k, unit) in fixed.iter_mut().enumerate() {
        if (faults.block >> k) & 1 != 0 {
            *unit = E::REPLACEMENT;
        }
    }

    unsafe { (dst as *mut [u16; W]).write(fixed) };
}

/// Window-parallel repair of `n` units.
///
/// # Safety
/// `n > W`, `W <= 64`; `src` valid for `n` reads and `dst` for `n` writes. When
/// `IN_PLACE` is set the pointers are equal.
pub(crate) unsafe fn utf16_to_well_formed<E: Endian, const W: usize, const IN_PLACE: bool>(
    src: *const u16,
    dst: *mut u16,
    n: usize,
) {
    debug_assert!(W <= 64 && n > W);

    unsafe {
        let first = src.read();
        dst.write(if scalar::is_low_surrogate::<E>(first) { E::REPLACEMENT } else { first });

        let mut i = 1;
        while i + W < n {
            utf16_fix_window::<E, W, IN_PLACE>(src.add(i), dst.add(i));
            i += W;
        }

        // Re-aligned final window, may overlap the previous one
        utf16_fix_window::<E, W, IN_PLACE>(src.add(n - W), dst.add(n - W));

        let last = dst.add(n - 1).read();
        if scalar::is_high_surrogate::<E>(last) {
            dst.add(n - 1).write(E::REPLACEMENT);
        }
    }
}

// ======================================================================
// UTF-8 -> Latin-1
// ======================================================================

/// State threaded from one converter window to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Latin1Carry {
    /// The previous window ended on a lead byte.
    pub pending_lead: bool,
    /// That lead byte was `0xC3`: the next byte needs `+0x40`.
    pub pending_high: bool,
}

impl Latin1Carry {
    /// Restart point for a window starting at `start` after `written` output bytes.
    #[inline(always)]
    pub fn rewind(&self, start: usize, written: usize) -> Rewind {
        Rewind { read: start - self.pending_lead as usize, written }
    }
}

/// Where a windowed converter gave up.
///
/// Every input byte before `read` was accepted and produced exactly `written`
/// output bytes; `read` is the start of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Rewind {
    pub read: usize,
    pub written: usize,
}

/// Converts one window of at most `W` bytes into `out`.
///
/// Returns the number of bytes written, or `None` if the window is rejected.
/// A window shorter than `W` is only valid as the last one of the input.
#[inline(always)]
pub(crate) fn utf8_to_latin1_window<const W: usize>(window: &[u8], out: &mut [u8], carry: &mut Latin1Carry) -> Option<usize> {
    debug_assert!(W >= 1 && W <= 64 && window.len() <= W);

    let len = window.len();
    let load_mask = lane_mask(len);

    let mut lanes = [0u8; W];
    lanes[..len].copy_from_slice(window);

    let mut nonascii = 0u64;
    let mut leading = 0u64;
    let mut bad_leading = 0u64;
    let mut bit6 = 0u64;

    for (k, &b) in lanes.iter().enumerate() {
        let is_leading = b >= 0xC0;
        let highbits = b ^ 0xC2;
        nonascii |= ((b >> 7) as u64) << k;
        leading |= (is_leading as u64) << k;
        bad_leading |= ((is_leading && highbits > 1) as u64) << k;
        bit6 |= ((is_leading && highbits == 1) as u64) << k;
    }

    if nonascii == 0 && !carry.pending_lead {
        out[..len].copy_from_slice(window);
        return Some(len);
    }

    if bad_leading != 0 {
        return None;
    }

    let expected = ((leading << 1) | carry.pending_lead as u64) & lane_mask(W);
    carry.pending_lead = (leading >> (W - 1)) & 1 != 0;

    if nonascii ^ leading != expected {
        return None;
    }

    let adjust = ((bit6 << 1) | carry.pending_high as u64) & load_mask;
    carry.pending_high = (bit6 >> (W - 1)) & 1 != 0;

    let retain = !leading & load_mask;
    let mut written = 0;
    for (k, &b) in lanes[..len].iter().enumerate() {
        if (retain >> k) & 1 != 0 {
            let offset = (((adjust >> k) & 1) as u8) << 6;
            out[written] = b.wrapping_add(offset);
            written += 1;
        }
    }

    Some(written)
}

/// Window-parallel converter.
///
/// Requires `output.len() >= input.len()`.
pub(crate) fn utf8_to_latin1<const W: usize>(input: &[u8], output: &mut [u8]) -> Result<usize, Rewind> {
    let mut carry = Latin1Carry::default();
    let mut written = 0;

    for (index, window) in input.chunks(W).enumerate() {
        let rewind = carry.rewind(index * W, written);
        match utf8_to_latin1_window::<W>(window, &mut output[written..], &mut carry) {
            Some(count) => written += count,
            None => return Err(rewind),
        }
    }

    // Truncated trailing lead byte
    if carry.pending_lead {
        return Err(carry.rewind(input.len(), written));
    }

    Ok(written)
}


#[cfg(kani)]
mod kani_verification_portable {
    use super::*;
    use crate::LittleEndian;

    const INPUT_LEN: usize = 19;

    #[kani::proof]
    #[kani::unwind(21)]
    fn check_repair_matches_scalar() {
        let input: [u16; INPUT_LEN] = kani::any();
        let mut windowed = [0u16; INPUT_LEN];
        let mut reference = [0u16; INPUT_LEN];

        unsafe {
            utf16_to_well_formed::<LittleEndian, 8, false>(input.as_ptr(), windowed.as_mut_ptr(), INPUT_LEN);
            scalar::to_well_formed_unsafe::<LittleEndian>(input.as_ptr(), reference.as_mut_ptr(), INPUT_LEN);
        }

        assert_eq!(windowed, reference, "Windowed repair diverged from scalar");
    }

    #[kani::proof]
    #[kani::unwind(21)]
    fn check_converter_robustness() {
        let input: [u8; INPUT_LEN] = kani::any();
        let mut out = [0u8; INPUT_LEN];

        // Never panics, never writes more than it reads
        if let Ok(written) = utf8_to_latin1::<8>(&input, &mut out) {
            assert!(written <= INPUT_LEN);
        }
    }
}
