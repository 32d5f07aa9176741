use crate::portable::Rewind;

#[cfg(target_arch = "x86")]
use std::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

// --- CONSTANTS ---

// Every byte >= 0xC0 is a lead byte
const LEAD_MIN: i8 = -64;
// Lead bytes XOR 0xC2 leave 0 (0xC2) or 1 (0xC3); anything larger is out of range
const LEAD_LATIN1: i8 = -62;

#[inline(always)]
const fn lane_mask(len: usize) -> __mmask64 {
    if len >= 64 { !0 } else { (1u64 << len) - 1 }
}

/// Converts one block of up to 64 bytes.
///
/// `next_leading` and `next_bit6` carry the last lane's lead flag and payload
/// bit into the next block. Returns `None` if the block is rejected.
#[inline]
#[target_feature(enable = "avx512f,avx512bw,avx512vbmi2")]
unsafe fn latin1_block_avx512(
    src: *const u8,
    len: usize,
    dst: *mut u8,
    next_leading: &mut u64,
    next_bit6: &mut u64,
) -> Option<usize> {
    let minus64 = _mm512_set1_epi8(LEAD_MIN);
    let one = _mm512_set1_epi8(1);

    let load_mask = lane_mask(len);
    let input = unsafe { _mm512_maskz_loadu_epi8(load_mask, src as *const i8) };
    let nonascii = _mm512_movepi8_mask(input);

    if nonascii == 0 && *next_leading == 0 {
        unsafe { _mm512_mask_storeu_epi8(dst as *mut i8, load_mask, input) };
        return Some(len);
    }

    let leading = _mm512_cmpge_epu8_mask(input, minus64);

    let highbits = _mm512_xor_si512(input, _mm512_set1_epi8(LEAD_LATIN1));
    if _mm512_mask_cmpgt_epu8_mask(leading, highbits, one) != 0 {
        return None;
    }

    let leading_shift = (leading << 1) | *next_leading;
    *next_leading = leading >> 63;

    if nonascii ^ leading != leading_shift {
        return None;
    }

    // Lead 0xC3: the continuation byte gains 0x40
    let bit6 = _mm512_mask_cmpeq_epi8_mask(leading, highbits, one);
    let adjusted = _mm512_mask_sub_epi8(input, (bit6 << 1) | *next_bit6, input, minus64);
    *next_bit6 = bit6 >> 63;

    let retain = !leading & load_mask;
    let packed = _mm512_maskz_compress_epi8(retain, adjusted);
    let written = retain.count_ones() as usize;

    unsafe { _mm512_mask_storeu_epi8(dst as *mut i8, lane_mask(written), packed) };
    Some(written)
}

/// Converts `input` in 64-byte blocks; the last block uses a masked load.
///
/// # Safety
/// `dst` must be valid for `input.len()` writes.
#[target_feature(enable = "avx512f,avx512bw,avx512vbmi2")]
pub unsafe fn utf8_to_latin1_avx512(input: &[u8], dst: *mut u8) -> Result<usize, Rewind> {
    let len = input.len();
    let src = input.as_ptr();

    let mut next_leading = 0u64;
    let mut next_bit6 = 0u64;
    let mut pos = 0;
    let mut written = 0;

    while pos < len {
        let block_len = (len - pos).min(64);
        let rewind = Rewind { read: pos - next_leading as usize, written };

        // SAFETY: `pos + block_len <= len`, and a block never writes more bytes than it reads.
        match unsafe { latin1_block_avx512(src.add(pos), block_len, dst.add(written), &mut next_leading, &mut next_bit6) } {
            Some(count) => written += count,
            None => return Err(rewind),
        }

        pos += block_len;
    }

    // Truncated trailing lead byte
    if next_leading != 0 {
        return Err(Rewind { read: len - 1, written });
    }

    Ok(written)
}
