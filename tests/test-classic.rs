#[cfg(all(test, not(miri)))]
mod exhaustive_tests {
    // --- Imports ---
    use utf_turbo::{utf8_to_latin1_into, Error, UTF16_BE, UTF16_LE, UTF16_NATIVE};

    // Reference Crate
    use encoding_rs::mem::{ensure_utf16_validity, is_utf8_latin1};
    use rand::{rng, Rng};

    const HIGH: u16 = 0xD83D;
    const LOW: u16 = 0xDE00;

    // --- Oracle Helpers ---
    fn random_units(len: usize) -> Vec<u16> {
        let mut rng = rng();
        (0..len)
            .map(|_| match rng.random_range(0..4) {
                0 => rng.random_range(0xD800..=0xDBFF),
                1 => rng.random_range(0xDC00..=0xDFFF),
                _ => rng.random(),
            })
            .collect()
    }

    fn random_latin1_utf8(len: usize) -> Vec<u8> {
        let mut rng = rng();
        let text: String = (0..len).map(|_| char::from(rng.random::<u8>())).collect();
        text.into_bytes()
    }

    /// The "Oracle" Test - compares native-endian repair against `encoding_rs`,
    /// through both the copying and the in-place API.
    #[track_caller]
    fn assert_repair_oracle(input: &[u16]) {
        // 1. Truth (Reference crate)
        let mut expected = input.to_vec();
        ensure_utf16_validity(&mut expected);

        // 2. Turbo copy
        let mut out = vec![0u16; input.len()];
        let written = UTF16_NATIVE.to_well_formed_into(input, &mut out).expect("Turbo to_well_formed_into failed");
        assert_eq!(written, input.len());
        assert!(out == expected, "Repair mismatch (copy). Input Len: {}", input.len());

        // 3. Turbo in place
        let mut buf = input.to_vec();
        UTF16_NATIVE.to_well_formed_in_place(&mut buf);
        assert!(buf == expected, "Repair mismatch (in place). Input Len: {}", input.len());

        // 4. Output is well-formed and stable
        assert!(UTF16_NATIVE.is_well_formed(&out));
        let mut again = out.clone();
        UTF16_NATIVE.to_well_formed_in_place(&mut again);
        assert!(again == out, "Repair is not idempotent. Input Len: {}", input.len());
    }

    /// Compares the converter against `encoding_rs` validation and std decoding.
    #[track_caller]
    fn assert_latin1_oracle(input: &[u8]) {
        let mut out = vec![0u8; input.len()];
        let result = utf8_to_latin1_into(input, &mut out);

        if is_utf8_latin1(input) {
            let expected: Vec<u8> = std::str::from_utf8(input).unwrap().chars().map(|c| c as u32 as u8).collect();
            let written = result.expect("Turbo rejected valid Latin-1 UTF-8");
            assert_eq!(&out[..written], expected.as_slice(), "Latin-1 mismatch. Input Len: {}", input.len());
        } else {
            let err = result.expect_err("Turbo accepted invalid input");
            // The prefix before the reported offset is itself accepted
            assert!(is_utf8_latin1(&input[..err.valid_up_to()]), "Bad valid_up_to {} for len {}", err.valid_up_to(), input.len());
        }
    }

    // --- 1. Basic Correctness ---
    #[test]
    fn test_repair_oracle_exhaustive_small() {
        for i in 0..=300 {
            let data = random_units(i);
            assert_repair_oracle(&data);
        }
    }

    #[test]
    fn test_repair_oracle_fuzz_medium() {
        let mut rng = rng();
        for _ in 0..200 {
            let len = rng.random_range(301..=8192);
            assert_repair_oracle(&random_units(len));
        }
    }

    #[test]
    fn test_latin1_oracle_exhaustive_small() {
        for i in 0..=300 {
            assert_latin1_oracle(&random_latin1_utf8(i));
        }
    }

    #[test]
    fn test_latin1_oracle_corrupted() {
        let mut rng = rng();
        for _ in 0..2_000 {
            let mut data = random_latin1_utf8(rng.random_range(1..=300));
            let at = rng.random_range(0..data.len());
            data[at] = rng.random();
            assert_latin1_oracle(&data);
        }
    }

    // --- Window / Scalar Transition Boundary Tests ---
    #[test]
    fn test_repair_window_transition_boundaries() {
        // Scalar below 9 units, 8-unit windows up to 16, 16-unit windows above
        let boundaries = [0, 1, 2, 7, 8, 9, 10, 15, 16, 17, 18, 31, 32, 33, 34, 63, 64, 65, 127, 128, 129];

        for &len in &boundaries {
            for pos in 0..len {
                for unit in [HIGH, LOW] {
                    let mut data = vec![0x0061u16; len];
                    data[pos] = unit;
                    assert_repair_oracle(&data);
                }
            }
            assert_repair_oracle(&random_units(len));
        }
    }

    #[test]
    fn test_straddling_pair_preserved() {
        // Pair on every possible window edge for both widths
        for len in [40usize, 41, 70] {
            for pos in 0..len - 1 {
                let mut data = vec![0x0061u16; len];
                data[pos] = HIGH;
                data[pos + 1] = LOW;

                let mut out = vec![0u16; len];
                UTF16_NATIVE.to_well_formed_into(&data, &mut out).unwrap();
                assert_eq!(out, data, "Pair at {} damaged (len={})", pos, len);
            }
        }
    }

    #[test]
    fn test_lone_surrogate_single_unit() {
        for unit in [HIGH, LOW, 0xD800, 0xDBFF, 0xDC00, 0xDFFF] {
            let mut out = [0u16; 1];
            UTF16_NATIVE.to_well_formed_into(&[unit], &mut out).unwrap();
            assert_eq!(out, [0xFFFD]);
        }
    }

    #[test]
    fn test_repair_big_endian_matches_little_endian() {
        let mut rng = rng();
        for _ in 0..200 {
            let len = rng.random_range(0..=200);
            let logical = random_units(len);

            let le: Vec<u16> = logical.iter().map(|u| u.to_le()).collect();
            let be: Vec<u16> = logical.iter().map(|u| u.to_be()).collect();

            let fixed_le: Vec<u16> = UTF16_LE.to_well_formed(&le).iter().map(|&u| u16::from_le(u)).collect();
            let fixed_be: Vec<u16> = UTF16_BE.to_well_formed(&be).iter().map(|&u| u16::from_be(u)).collect();

            assert_eq!(fixed_le, fixed_be, "Byte orders disagree (len={})", len);
        }
    }

    #[test]
    fn test_latin1_straddle_every_window_width() {
        for prefix in [7usize, 15, 31, 63, 127] {
            let mut data = vec![b'a'; prefix];
            data.extend_from_slice(&[0xC3, 0xA4]);

            let mut out = vec![0u8; data.len()];
            let written = utf8_to_latin1_into(&data, &mut out).unwrap();
            assert_eq!(written, prefix + 1);
            assert_eq!(out[prefix], 0xE4);
        }
    }

    // --- Concrete cases ---
    #[test]
    fn test_latin1_concrete() {
        let mut out = [0u8; 4];
        assert_eq!(utf8_to_latin1_into([0xC3u8, 0xA4], &mut out), Ok(1));
        assert_eq!(out[0], 0xE4);

        let err = utf8_to_latin1_into([0xC4u8, 0x80], &mut out).unwrap_err();
        assert_eq!(err.error(), Error::TooLarge);
        assert_eq!(err.valid_up_to(), 0);
    }

    #[test]
    fn test_latin1_ascii_passthrough() {
        let data: Vec<u8> = (0..1000).map(|i| (i % 128) as u8).collect();
        let mut out = vec![0u8; data.len()];
        assert_eq!(utf8_to_latin1_into(&data, &mut out), Ok(data.len()));
        assert_eq!(out, data);
    }

    // --- Negative / Error Path Tests ---
    #[test]
    fn test_rejection_is_total() {
        let mut data = random_latin1_utf8(500);
        data.push(0xBF);
        data.extend_from_slice(&random_latin1_utf8(20));

        let mut out = vec![0u8; data.len()];
        let err = utf8_to_latin1_into(&data, &mut out).unwrap_err();
        assert_eq!(err.error(), Error::TooLong);
    }

    #[test]
    fn test_reject_invalid_sequences() {
        let invalid_inputs: &[(&[u8], Error)] = &[
            (b"\xc3", Error::TooShort),
            (b"abc\xc3", Error::TooShort),
            (b"\xc3abc", Error::TooShort),
            (b"\x80", Error::TooLong),
            (b"ab\xa4", Error::TooLong),
            (b"\xc0\x80", Error::Overlong),
            (b"\xc1\xbf", Error::Overlong),
            (b"\xc5\x93", Error::TooLarge),
            (b"\xe2\x82\xac", Error::TooLarge),
            (b"\xf0\x9f\x98\x80", Error::TooLarge),
            (b"\xf8\x88\x80\x80\x80", Error::HeaderBits),
        ];

        let mut buf = [0u8; 100];
        for &(inp, error) in invalid_inputs {
            let err = utf8_to_latin1_into(inp, &mut buf).expect_err("Failed to reject invalid sequence");
            assert_eq!(err.error(), error, "Wrong error for {:02x?}", inp);
        }
    }

    #[test]
    fn test_truncated_lead_rejected_at_window_end() {
        for len in [1usize, 2, 63, 64, 65, 127, 128, 129] {
            let mut data = vec![b'z'; len];
            data[len - 1] = 0xC2;

            let mut out = vec![0u8; len];
            let err = utf8_to_latin1_into(&data, &mut out).unwrap_err();
            assert_eq!(err.error(), Error::TooShort);
            assert_eq!(err.valid_up_to(), len - 1);
        }
    }

    #[test]
    fn test_buffer_too_small() {
        let data = [0x61u16; 10];
        let mut small = [0u16; 9];
        assert_eq!(UTF16_NATIVE.to_well_formed_into(&data, &mut small), Err(Error::BufferTooSmall));

        let mut small = [0u8; 3];
        let err = utf8_to_latin1_into("abcd", &mut small).unwrap_err();
        assert_eq!(err.error(), Error::BufferTooSmall);
    }

    #[test]
    fn test_empty_input() {
        let mut out: [u8; 0] = [];
        assert_eq!(utf8_to_latin1_into(b"", &mut out), Ok(0));

        let mut units: [u16; 0] = [];
        assert_eq!(UTF16_NATIVE.to_well_formed_into(&[], &mut units), Ok(0));
        UTF16_NATIVE.to_well_formed_in_place(&mut units);
    }
}
