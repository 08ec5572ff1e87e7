//! Big-endian IEEE-754 scalar encoding for command payloads.
//!
//! The ScioSpec wire format transmits floating-point command parameters
//! (amplitude, frame rate, excitation frequencies) most-significant byte
//! first. These helpers are pure and total for finite inputs; NaN and
//! infinity pass through bit-exactly, so callers validate values before
//! encoding.

/// Encode a single-precision value big-endian.
pub fn encode_f32(v: f32) -> [u8; 4] {
    v.to_be_bytes()
}

/// Encode a double-precision value big-endian.
pub fn encode_f64(v: f64) -> [u8; 8] {
    v.to_be_bytes()
}

/// Decode a big-endian single-precision value.
pub fn decode_f32(bytes: [u8; 4]) -> f32 {
    f32::from_be_bytes(bytes)
}

/// Decode a big-endian double-precision value.
pub fn decode_f64(bytes: [u8; 8]) -> f64 {
    f64::from_be_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f32_round_trip() {
        for v in [0.0f32, 1.0, -1.0, 10.0, 10_000.0, 1.0e-3, f32::MIN, f32::MAX] {
            assert_eq!(decode_f32(encode_f32(v)), v);
        }
    }

    #[test]
    fn f64_round_trip() {
        for v in [0.0f64, 0.01, -0.01, 1.0e-7, f64::MIN, f64::MAX] {
            assert_eq!(decode_f64(encode_f64(v)), v);
        }
    }

    // Reference patterns taken from captured device configuration traffic.
    #[test]
    fn known_device_patterns() {
        // 1 mA excitation amplitude
        assert_eq!(
            encode_f64(0.001),
            [0x3F, 0x50, 0x62, 0x4D, 0xD2, 0xF1, 0xA9, 0xFC]
        );
        // 10 Hz frame rate
        assert_eq!(encode_f32(10.0), [0x41, 0x20, 0x00, 0x00]);
        // 10 kHz excitation frequency
        assert_eq!(encode_f32(10_000.0), [0x46, 0x1C, 0x40, 0x00]);
    }

    #[test]
    fn non_finite_pass_through() {
        assert!(decode_f32(encode_f32(f32::NAN)).is_nan());
        assert_eq!(decode_f64(encode_f64(f64::INFINITY)), f64::INFINITY);
    }
}
