#![forbid(unsafe_code)]

/// djb2 (k = 33): `h = h * 33 + c`, seeded with 5381.
///
/// Hashes bytes up to the first NUL or the end of input. Wrapping u32
/// arithmetic; not collision resistant.
pub fn djb2(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take_while(|&&b| b != 0)
        .fold(5381u32, |h, &b| {
            (h << 5).wrapping_add(h).wrapping_add(u32::from(b))
        })
}
