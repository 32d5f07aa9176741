use crate::{Endian, Error, Utf8Error};

// ======================================================================
// UTF-16 Classifiers
// ======================================================================

/// Returns `true` if the stored unit is a high (leading) surrogate `0xD800..=0xDBFF`.
#[inline(always)]
pub fn is_high_surrogate<E: Endian>(unit: u16) -> bool {
    unit & E::SURROGATE_MASK == E::HIGH_TAG
}

/// Returns `true` if the stored unit is a low (trailing) surrogate `0xDC00..=0xDFFF`.
#[inline(always)]
pub fn is_low_surrogate<E: Endian>(unit: u16) -> bool {
    unit & E::SURROGATE_MASK == E::LOW_TAG
}

// ======================================================================
// UTF-16 Repair
// ======================================================================

/// Replaces every unpaired surrogate with U+FFFD, one unit at a time.
///
/// `src` and `dst` may point to the same buffer.
///
/// # Safety
/// `src` must be valid for `n` reads and `dst` valid for `n` writes.
#[inline(always)]
pub unsafe fn to_well_formed_unsafe<E: Endian>(src: *const u16, dst: *mut u16, n: usize) {
    let mut i = 0;

    unsafe {
        while i < n {
            let unit = *src.add(i);

            if is_high_surrogate::<E>(unit) {
                if i + 1 < n && is_low_surrogate::<E>(*src.add(i + 1)) {
                    let low = *src.add(i + 1);
                    *dst.add(i) = unit;
                    *dst.add(i + 1) = low;
                    i += 2;
                    continue;
                }
                *dst.add(i) = E::REPLACEMENT;
            } else if is_low_surrogate::<E>(unit) {
                *dst.add(i) = E::REPLACEMENT;
            } else {
                *dst.add(i) = unit;
            }

            i += 1;
        }
    }
}

/// Checks that every surrogate in `input` is part of a high/low pair.
pub fn is_well_formed<E: Endian>(input: &[u16]) -> bool {
    let mut units = input.iter();

    while let Some(&unit) = units.next() {
        if is_high_surrogate::<E>(unit) {
            match units.next() {
                Some(&low) if is_low_surrogate::<E>(low) => {}
                _ => return false,
            }
        } else if is_low_surrogate::<E>(unit) {
            return false;
        }
    }

    true
}

// ======================================================================
// UTF-8 -> Latin-1
// ======================================================================

/// Decodes the sequence starting at `pos` into a Latin-1 byte.
///
/// Returns the byte and the number of input bytes consumed.
#[inline(always)]
fn decode_latin1(input: &[u8], pos: usize) -> Result<(u8, usize), Error> {
    let lead = input[pos];

    match lead {
        0x00..=0x7F => Ok((lead, 1)),
        0x80..=0xBF => Err(Error::TooLong),
        0xC0..=0xDF => {
            let cont = match input.get(pos + 1) {
                Some(&b) if b & 0xC0 == 0x80 => b,
                _ => return Err(Error::TooShort),
            };

            let code_point = ((lead as u32 & 0x1F) << 6) | (cont as u32 & 0x3F);
            if code_point < 0x80 {
                Err(Error::Overlong)
            } else if code_point > 0xFF {
                Err(Error::TooLarge)
            } else {
                Ok((code_point as u8, 2))
            }
        }
        0xE0..=0xF7 => Err(Error::TooLarge),
        0xF8..=0xFF => Err(Error::HeaderBits),
    }
}

/// Reference converter: transcodes `input` one sequence at a time.
///
/// Reports the first offending sequence in input order. The caller guarantees
/// `output.len() >= input.len()`.
pub fn utf8_to_latin1(input: &[u8], output: &mut [u8]) -> Result<usize, Utf8Error> {
    let len = input.len();
    let mut pos = 0;
    let mut written = 0;

    // Fast loop: 8 ASCII bytes at a time
    while pos < len {
        if pos + 8 <= len {
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&input[pos..pos + 8]);
            if u64::from_ne_bytes(chunk) & 0x8080_8080_8080_8080 == 0 {
                output[written..written + 8].copy_from_slice(&chunk);
                pos += 8;
                written += 8;
                continue;
            }
        }

        match decode_latin1(input, pos) {
            Ok((byte, consumed)) => {
                output[written] = byte;
                written += 1;
                pos += consumed;
            }
            Err(error) => return Err(Utf8Error::new(error, pos)),
        }
    }

    Ok(written)
}

/// Number of Latin-1 bytes a valid input transcodes to: every byte that is
/// not a continuation byte.
#[inline]
pub fn latin1_len_from_utf8(input: &[u8]) -> usize {
    input.iter().filter(|&&b| (b as i8) >= -64).count()
}
