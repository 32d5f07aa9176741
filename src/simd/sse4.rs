use crate::{scalar, Endian};

#[cfg(target_arch = "x86")]
use std::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

/// Process one block of 8 units. Same contract as the AVX2 block.
#[inline]
#[target_feature(enable = "sse4.1")]
unsafe fn fix_block_sse4<E: Endian, const IN_PLACE: bool>(src: *const u16, dst: *mut u16) {
    let lookback = unsafe { _mm_loadu_si128(src.sub(1) as *const __m128i) };
    let block = unsafe { _mm_loadu_si128(src as *const __m128i) };

    let mask = _mm_set1_epi16(E::SURROGATE_MASK as i16);
    let lb_is_high = _mm_cmpeq_epi16(_mm_and_si128(lookback, mask), _mm_set1_epi16(E::HIGH_TAG as i16));
    let block_is_low = _mm_cmpeq_epi16(_mm_and_si128(block, mask), _mm_set1_epi16(E::LOW_TAG as i16));

    let illseq = _mm_xor_si128(lb_is_high, block_is_low);
    if _mm_testz_si128(illseq, illseq) != 0 {
        if !IN_PLACE {
            unsafe { _mm_storeu_si128(dst as *mut __m128i, block) };
        }
        return;
    }

    let lb_illseq = _mm_andnot_si128(block_is_low, lb_is_high);
    let block_illseq = _mm_or_si128(_mm_andnot_si128(lb_is_high, block_is_low), _mm_bsrli_si128(lb_illseq, 2));

    if _mm_cvtsi128_si32(lb_illseq) & 0xFFFF != 0 {
        unsafe { dst.sub(1).write(E::REPLACEMENT) };
    }

    let fixed = _mm_blendv_epi8(block, _mm_set1_epi16(E::REPLACEMENT as i16), block_illseq);
    unsafe { _mm_storeu_si128(dst as *mut __m128i, fixed) };
}

/// Repairs `len` units with 8-unit windows.
///
/// # Safety
/// `len > 8`; `src` valid for `len` reads, `dst` for `len` writes, and the
/// pointers are equal when `IN_PLACE` is set.
#[target_feature(enable = "sse4.1")]
pub unsafe fn to_well_formed_sse4<E: Endian, const IN_PLACE: bool>(src: *const u16, dst: *mut u16, len: usize) {
    debug_assert!(len > 8);

    unsafe {
        let first = src.read();
        dst.write(if scalar::is_low_surrogate::<E>(first) { E::REPLACEMENT } else { first });

        let mut i = 1;
        while i + 8 < len {
            fix_block_sse4::<E, IN_PLACE>(src.add(i), dst.add(i));
            i += 8;
        }

        fix_block_sse4::<E, IN_PLACE>(src.add(len - 8), dst.add(len - 8));

        let last = dst.add(len - 1).read();
        if scalar::is_high_surrogate::<E>(last) {
            dst.add(len - 1).write(E::REPLACEMENT);
        }
    }
}
