/// Whether `value` is one of the sixteen RFC 8701 GREASE code points
/// (0x0A0A, 0x1A1A, ..., 0xFAFA).
pub fn is_grease(value: u16) -> bool {
    let [hi, lo] = value.to_be_bytes();
    hi == lo && hi & 0x0f == 0x0a
}

/// Copy of `values` with GREASE code points removed, order preserved.
pub fn without_grease(values: &[u16]) -> Vec<u16> {
    values.iter().copied().filter(|v| !is_grease(*v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_every_grease_value() {
        for hi in 0u16..16 {
            let byte = (hi << 4) | 0x0a;
            let value = (byte << 8) | byte;
            assert!(is_grease(value), "0x{:04x}", value);
        }
    }

    #[test]
    fn leaves_real_code_points_alone() {
        for value in [0x0000, 0x0303, 0x0a0b, 0x1301, 0xc02b, 0x00ff, 0xfafb] {
            assert!(!is_grease(value), "0x{:04x}", value);
        }
    }

    #[test]
    fn filtering_keeps_order() {
        assert_eq!(
            without_grease(&[0xdada, 0xc02f, 0x2a2a, 0x1301, 0xc02b]),
            vec![0xc02f, 0x1301, 0xc02b]
        );
    }
}
