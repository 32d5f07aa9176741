use crate::{scalar, Endian};

#[cfg(target_arch = "x86")]
use std::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

/// Process one block of 16 units.
///
/// Reads `src[-1..16]`. If `IN_PLACE` is false the block is copied to `dst`.
/// Ill-sequenced units are overwritten with the replacement character,
/// including `dst[-1]` when the lookback is a high surrogate without its low.
#[inline]
#[target_feature(enable = "avx2")]
unsafe fn fix_block_avx2<E: Endian, const IN_PLACE: bool>(src: *const u16, dst: *mut u16) {
    let lookback = unsafe { _mm256_loadu_si256(src.sub(1) as *const __m256i) };
    let block = unsafe { _mm256_loadu_si256(src as *const __m256i) };

    let mask = _mm256_set1_epi16(E::SURROGATE_MASK as i16);
    let lb_is_high = _mm256_cmpeq_epi16(_mm256_and_si256(lookback, mask), _mm256_set1_epi16(E::HIGH_TAG as i16));
    let block_is_low = _mm256_cmpeq_epi16(_mm256_and_si256(block, mask), _mm256_set1_epi16(E::LOW_TAG as i16));

    let illseq = _mm256_xor_si256(lb_is_high, block_is_low);
    if _mm256_testz_si256(illseq, illseq) != 0 {
        if !IN_PLACE {
            unsafe { _mm256_storeu_si256(dst as *mut __m256i, block) };
        }
        return;
    }

    // Cause of the illegal sequencing: a high without its low blames the
    // previous lane, so shift it down one unit across the 128-bit halves.
    let lb_illseq = _mm256_andnot_si256(block_is_low, lb_is_high);
    let lb_illseq_shifted = _mm256_or_si256(
        _mm256_bsrli_epi128(lb_illseq, 2),
        _mm256_zextsi128_si256(_mm_bslli_si128(_mm256_extracti128_si256(lb_illseq, 1), 14)),
    );
    let block_illseq = _mm256_or_si256(_mm256_andnot_si256(lb_is_high, block_is_low), lb_illseq_shifted);

    // Lane 0 of `lb_illseq` is the lookback itself
    if _mm256_cvtsi256_si32(lb_illseq) & 0xFFFF != 0 {
        unsafe { dst.sub(1).write(E::REPLACEMENT) };
    }

    let fixed = _mm256_blendv_epi8(block, _mm256_set1_epi16(E::REPLACEMENT as i16), block_illseq);
    unsafe { _mm256_storeu_si256(dst as *mut __m256i, fixed) };
}

/// Repairs `len` units with 16-unit windows.
///
/// # Safety
/// `len > 16`; `src` valid for `len` reads, `dst` for `len` writes, and the
/// pointers are equal when `IN_PLACE` is set.
#[target_feature(enable = "avx2")]
pub unsafe fn to_well_formed_avx2<E: Endian, const IN_PLACE: bool>(src: *const u16, dst: *mut u16, len: usize) {
    debug_assert!(len > 16);

    unsafe {
        let first = src.read();
        dst.write(if scalar::is_low_surrogate::<E>(first) { E::REPLACEMENT } else { first });

        // --- Main loop: 16 units per block ---
        let mut i = 1;
        while i + 16 < len {
            fix_block_avx2::<E, IN_PLACE>(src.add(i), dst.add(i));
            i += 16;
        }

        // --- Final block, re-aligned to end at the last unit ---
        fix_block_avx2::<E, IN_PLACE>(src.add(len - 16), dst.add(len - 16));

        let last = dst.add(len - 1).read();
        if scalar::is_high_surrogate::<E>(last) {
            dst.add(len - 1).write(E::REPLACEMENT);
        }
    }
}
