#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![doc(issue_tracker_base_url = "https://github.com/hacer-bark/utf-turbo/issues/")]
#![deny(unsafe_op_in_unsafe_fn)]
// #![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(unused_qualifications)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Scalar reference implementation
mod scalar;
// Generic-width window kernels
mod portable;
// SIMD implementation (x86/x86_64 only)
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[cfg(feature = "simd")]
mod simd;

// ======================================================================
// ERROR DEFINITION
// ======================================================================

/// Errors that can occur while transcoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The provided output buffer is too small to hold the result.
    ///
    /// Returned by the zero-allocation APIs when the destination slice is
    /// shorter than the bound given by [`max_latin1_len`] or by the input
    /// length for UTF-16 repair.
    BufferTooSmall,

    /// A byte in the `0xF8..=0xFF` range, which no UTF-8 sequence starts with.
    HeaderBits,

    /// A lead byte is not followed by a continuation byte, either because the
    /// next byte is something else or because the input ends.
    TooShort,

    /// A continuation byte appears without a lead byte.
    TooLong,

    /// A two-byte sequence encodes a code point below U+0080 (`0xC0`/`0xC1` leads).
    Overlong,

    /// The sequence encodes a code point above U+00FF, which Latin-1 cannot hold.
    ///
    /// Every three- and four-byte sequence falls in this class.
    TooLarge,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::BufferTooSmall => write!(f, "Destination buffer is too small"),
            Error::HeaderBits => write!(f, "Byte is not a valid UTF-8 lead byte"),
            Error::TooShort => write!(f, "UTF-8 lead byte is missing its continuation byte"),
            Error::TooLong => write!(f, "UTF-8 continuation byte without a lead byte"),
            Error::Overlong => write!(f, "Overlong UTF-8 sequence"),
            Error::TooLarge => write!(f, "Code point does not fit in Latin-1"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Rejection report of the UTF-8 to Latin-1 converter.
///
/// Carries the kind of the first offending sequence and its offset in the
/// input. Everything before [`valid_up_to`](Self::valid_up_to) is valid
/// Latin-1-range UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utf8Error {
    error: Error,
    valid_up_to: usize,
}

impl Utf8Error {
    #[inline]
    pub(crate) const fn new(error: Error, valid_up_to: usize) -> Self {
        Self { error, valid_up_to }
    }

    /// What went wrong.
    #[inline]
    pub const fn error(&self) -> Error {
        self.error
    }

    /// Offset of the first byte of the offending sequence.
    #[inline]
    pub const fn valid_up_to(&self) -> usize {
        self.valid_up_to
    }

    #[inline]
    const fn offset_by(self, base: usize) -> Self {
        Self::new(self.error, self.valid_up_to + base)
    }
}

impl core::fmt::Display for Utf8Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} at byte offset {}", self.error, self.valid_up_to)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Utf8Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

// ======================================================================
// Configuration & Types
// ======================================================================

/// Byte order of the UTF-16 code units in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    /// Byte order of the target.
    #[cfg(target_endian = "little")]
    pub const NATIVE: Endianness = Endianness::Little;
    /// Byte order of the target.
    #[cfg(target_endian = "big")]
    pub const NATIVE: Endianness = Endianness::Big;
}

#[inline(always)]
const fn stored(value: u16, swapped: bool) -> u16 {
    if swapped { value.swap_bytes() } else { value }
}

mod sealed {
    pub trait Sealed {}
}

/// Compile-time byte order tag.
///
/// Kernels are monomorphized per tag. The associated constants are the
/// in-memory forms of the values the kernels compare against, so stored
/// units never need swapping.
pub trait Endian: sealed::Sealed + Copy + 'static {
    /// Runtime value of this tag.
    const ENDIANNESS: Endianness;

    #[doc(hidden)]
    const SWAPPED: bool = !matches!(
        (Self::ENDIANNESS, Endianness::NATIVE),
        (Endianness::Little, Endianness::Little) | (Endianness::Big, Endianness::Big)
    );

    /// Selects the top 6 bits of a unit.
    const SURROGATE_MASK: u16 = stored(0xFC00, Self::SWAPPED);
    /// `110110` tag of a high surrogate.
    const HIGH_TAG: u16 = stored(0xD800, Self::SWAPPED);
    /// `110111` tag of a low surrogate.
    const LOW_TAG: u16 = stored(0xDC00, Self::SWAPPED);
    /// U+FFFD REPLACEMENT CHARACTER.
    const REPLACEMENT: u16 = stored(0xFFFD, Self::SWAPPED);
}

/// UTF-16LE tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LittleEndian;

/// UTF-16BE tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BigEndian;

impl sealed::Sealed for LittleEndian {}
impl sealed::Sealed for BigEndian {}

impl Endian for LittleEndian {
    const ENDIANNESS: Endianness = Endianness::Little;
}

impl Endian for BigEndian {
    const ENDIANNESS: Endianness = Endianness::Big;
}

/// Internal configuration for the UTF-16 engine.
///
/// This struct uses `repr(C)` to ensure predictable memory layout.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct Config {
    pub endianness: Endianness,
}

/// UTF-16 engine bound to one byte order.
///
/// Units are passed as they sit in memory; a big-endian engine on a
/// little-endian host classifies `0x00D8` as a high surrogate.
#[derive(Debug, Clone, Copy)]
pub struct Utf16 {
    pub(crate) config: Config,
}

// ======================================================================
// Pre-defined Engines
// ======================================================================

pub const UTF16_LE: Utf16 = Utf16 {
    config: Config {
        endianness: Endianness::Little,
    },
};

pub const UTF16_BE: Utf16 = Utf16 {
    config: Config {
        endianness: Endianness::Big,
    },
};

pub const UTF16_NATIVE: Utf16 = Utf16 {
    config: Config {
        endianness: Endianness::NATIVE,
    },
};

impl Utf16 {
    /// Builds an engine for an endianness only known at runtime.
    #[inline]
    #[must_use]
    pub const fn new(endianness: Endianness) -> Self {
        Self { config: Config { endianness } }
    }

    /// Byte order this engine reads and writes.
    #[inline]
    #[must_use]
    pub const fn endianness(&self) -> Endianness {
        self.config.endianness
    }

    // ======================================================================
    // Classifiers
    // ======================================================================

    /// Returns `true` if `unit` is a high (leading) surrogate in this byte order.
    #[inline]
    #[must_use]
    pub fn is_high_surrogate(&self, unit: u16) -> bool {
        match self.config.endianness {
            Endianness::Little => scalar::is_high_surrogate::<LittleEndian>(unit),
            Endianness::Big => scalar::is_high_surrogate::<BigEndian>(unit),
        }
    }

    /// Returns `true` if `unit` is a low (trailing) surrogate in this byte order.
    #[inline]
    #[must_use]
    pub fn is_low_surrogate(&self, unit: u16) -> bool {
        match self.config.endianness {
            Endianness::Little => scalar::is_low_surrogate::<LittleEndian>(unit),
            Endianness::Big => scalar::is_low_surrogate::<BigEndian>(unit),
        }
    }

    /// Checks that every surrogate in `input` belongs to a high/low pair.
    #[must_use]
    pub fn is_well_formed(&self, input: &[u16]) -> bool {
        match self.config.endianness {
            Endianness::Little => scalar::is_well_formed::<LittleEndian>(input),
            Endianness::Big => scalar::is_well_formed::<BigEndian>(input),
        }
    }

    // ======================================================================
    // Zero-Allocation APIs
    // ======================================================================

    /// Copies `input` into `output`, replacing every unpaired surrogate with
    /// U+FFFD.
    ///
    /// The result is always well-formed UTF-16 of the same length. Repairing
    /// well-formed input is a plain copy.
    ///
    /// # Returns
    ///
    /// * `Ok(usize)`: The number of units written (`input.len()`).
    /// * `Err(Error::BufferTooSmall)`: If `output.len()` is less than `input.len()`.
    ///
    /// # Examples
    ///
    /// ```
    /// use utf_turbo::UTF16_NATIVE;
    ///
    /// let mut out = [0u16; 3];
    /// UTF16_NATIVE.to_well_formed_into(&[0x61, 0xD800, 0x62], &mut out).unwrap();
    /// assert_eq!(out, [0x61, 0xFFFD, 0x62]);
    /// ```
    #[inline]
    pub fn to_well_formed_into(&self, input: &[u16], output: &mut [u16]) -> Result<usize, Error> {
        let len = input.len();

        if len == 0 {
            return Ok(0);
        }

        if output.len() < len {
            return Err(Error::BufferTooSmall);
        }

        // SAFETY: `input` is valid for `len` reads and `output` for `len` writes;
        // the borrows guarantee they do not overlap.
        unsafe { Self::repair_dispatch(self, input.as_ptr(), output.as_mut_ptr(), len, false) };

        Ok(len)
    }

    /// Replaces every unpaired surrogate in `buffer` with U+FFFD.
    ///
    /// # Examples
    ///
    /// ```
    /// use utf_turbo::UTF16_NATIVE;
    ///
    /// let mut buf = [0xDC00, 0xD83D, 0xDE00, 0xD800];
    /// UTF16_NATIVE.to_well_formed_in_place(&mut buf);
    /// assert_eq!(buf, [0xFFFD, 0xD83D, 0xDE00, 0xFFFD]);
    /// ```
    #[inline]
    pub fn to_well_formed_in_place(&self, buffer: &mut [u16]) {
        let len = buffer.len();

        if len == 0 {
            return;
        }

        let ptr = buffer.as_mut_ptr();
        // SAFETY: Both pointers come from the same exclusive borrow of `len` units.
        unsafe { Self::repair_dispatch(self, ptr, ptr, len, true) };
    }

    // ========================================================================
    // Allocating APIs (std)
    // ========================================================================

    /// Returns a well-formed copy of `input`.
    #[inline]
    #[cfg(feature = "std")]
    pub fn to_well_formed(&self, input: &[u16]) -> Vec<u16> {
        let mut out = input.to_vec();
        Self::to_well_formed_in_place(self, &mut out);
        out
    }

    // ========================================================================
    // Internal Dispatchers
    // ========================================================================

    #[inline(always)]
    unsafe fn repair_dispatch(&self, src: *const u16, dst: *mut u16, len: usize, in_place: bool) {
        // SAFETY: Pointers verified by caller
        unsafe {
            match (self.config.endianness, in_place) {
                (Endianness::Little, true) => repair_with::<LittleEndian, true>(src, dst, len),
                (Endianness::Little, false) => repair_with::<LittleEndian, false>(src, dst, len),
                (Endianness::Big, true) => repair_with::<BigEndian, true>(src, dst, len),
                (Endianness::Big, false) => repair_with::<BigEndian, false>(src, dst, len),
            }
        }
    }
}

#[inline(always)]
unsafe fn repair_with<E: Endian, const IN_PLACE: bool>(src: *const u16, dst: *mut u16, len: usize) {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    #[cfg(feature = "simd")]
    {
        // Smart degrade: a window needs one unit of lookback in front of it.
        if len > 16 && std::is_x86_feature_detected!("avx2") {
            unsafe { simd::to_well_formed_avx2::<E, IN_PLACE>(src, dst, len) };
            return;
        }

        if len > 8 && std::is_x86_feature_detected!("sse4.1") {
            unsafe { simd::to_well_formed_sse4::<E, IN_PLACE>(src, dst, len) };
            return;
        }
    }

    // Fallback: Portable windows / Non-x86 / Short inputs
    // Safety: Pointers verified by caller
    unsafe {
        if len > 16 {
            portable::utf16_to_well_formed::<E, 16, IN_PLACE>(src, dst, len);
        } else if len > 8 {
            portable::utf16_to_well_formed::<E, 8, IN_PLACE>(src, dst, len);
        } else {
            scalar::to_well_formed_unsafe::<E>(src, dst, len);
        }
    }
}

// ======================================================================
// UTF-8 -> Latin-1
// ======================================================================

/// Calculates the buffer size [`utf8_to_latin1_into`] requires for `input_len` bytes.
///
/// This is an upper bound: every two-byte sequence shrinks to one byte.
/// Rely on the returned count for the actual output length.
#[inline]
#[must_use]
pub const fn max_latin1_len(input_len: usize) -> usize {
    input_len
}

/// Exact Latin-1 length of `input`, assuming it is valid.
///
/// Counts the bytes that are not UTF-8 continuation bytes.
#[inline]
#[must_use]
pub fn latin1_len_from_utf8<T: AsRef<[u8]>>(input: T) -> usize {
    scalar::latin1_len_from_utf8(input.as_ref())
}

/// Transcodes UTF-8 `input` into Latin-1 in `output`.
///
/// Only code points U+0000..=U+00FF are accepted, i.e. ASCII and two-byte
/// sequences led by `0xC2` or `0xC3`. Any other sequence, a misplaced
/// continuation byte, or a lead byte cut off by the end of the input rejects
/// the whole call; `output` must then not be read.
///
/// # Returns
///
/// * `Ok(usize)`: The number of bytes written to `output`. Zero only for empty input.
/// * `Err(Utf8Error)`: The first offending sequence and its offset, or
///   [`Error::BufferTooSmall`] if `output.len()` is less than [`max_latin1_len`].
///
/// # Examples
///
/// ```
/// use utf_turbo::{utf8_to_latin1_into, Error};
///
/// let mut out = [0u8; 8];
/// let written = utf8_to_latin1_into("caf\u{e9}", &mut out).unwrap();
/// assert_eq!(&out[..written], b"caf\xe9");
///
/// let err = utf8_to_latin1_into("\u{20ac}", &mut out).unwrap_err();
/// assert_eq!(err.error(), Error::TooLarge);
/// ```
#[inline]
pub fn utf8_to_latin1_into<T: AsRef<[u8]>>(input: T, output: &mut [u8]) -> Result<usize, Utf8Error> {
    let input = input.as_ref();
    let len = input.len();

    if len == 0 {
        return Ok(0);
    }

    if output.len() < max_latin1_len(len) {
        return Err(Utf8Error::new(Error::BufferTooSmall, 0));
    }

    match latin1_dispatch(input, output) {
        Ok(written) => Ok(written),
        // --- Scalar re-scan ---
        // Everything before `read` is valid, so the scalar pass finishes the
        // call and reports the exact offending sequence.
        Err(rewind) => {
            let rescan = scalar::utf8_to_latin1(&input[rewind.read..], &mut output[rewind.written..]);
            debug_assert!(rescan.is_err(), "window rejected a suffix the scalar pass accepts");
            rescan
                .map(|written| rewind.written + written)
                .map_err(|err| err.offset_by(rewind.read))
        }
    }
}

/// Allocates a new `Vec<u8>` and transcodes `input` into it.
///
/// # Errors
/// Returns [`Utf8Error`] if `input` is not UTF-8 restricted to U+0000..=U+00FF.
///
/// # Examples
///
/// ```
/// let bytes = utf_turbo::utf8_to_latin1("gr\u{fc}\u{df}e").unwrap();
/// assert_eq!(bytes, b"gr\xfc\xdfe");
/// ```
#[inline]
#[cfg(feature = "std")]
pub fn utf8_to_latin1<T: AsRef<[u8]>>(input: T) -> Result<Vec<u8>, Utf8Error> {
    let input = input.as_ref();
    let mut out = vec![0u8; max_latin1_len(input.len())];
    let written = utf8_to_latin1_into(input, &mut out)?;
    out.truncate(written);
    Ok(out)
}

#[inline(always)]
fn latin1_dispatch(input: &[u8], output: &mut [u8]) -> Result<usize, portable::Rewind> {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    #[cfg(feature = "avx512")]
    {
        // Smart degrade: If len < 64, don't bother setting up ZMM registers.
        if input.len() >= 64
            && std::is_x86_feature_detected!("avx512f")
            && std::is_x86_feature_detected!("avx512bw")
            && std::is_x86_feature_detected!("avx512vbmi2")
        {
            // SAFETY: `output` holds at least `input.len()` bytes, checked by the caller.
            return unsafe { simd::utf8_to_latin1_avx512(input, output.as_mut_ptr()) };
        }
    }

    portable::utf8_to_latin1::<64>(input, output)
}
