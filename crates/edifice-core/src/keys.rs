//! Fixed-width 32-byte keys.
//!
//! Source-file and container keys travel as 32-byte words in the tooling's
//! export. Text longer than 32 bytes is truncated, shorter text is
//! zero-padded.

/// Width of a fixed key in bytes.
pub const KEY_WIDTH: usize = 32;

/// Packs UTF-8 text into a zero-padded 32-byte key.
pub fn fixed_key(text: &str) -> [u8; KEY_WIDTH] {
    let mut key = [0u8; KEY_WIDTH];
    let bytes = text.as_bytes();
    let len = bytes.len().min(KEY_WIDTH);
    key[..len].copy_from_slice(&bytes[..len]);
    key
}

/// Renders a key as `0x` followed by 64 lowercase hex digits.
pub fn key_hex(key: &[u8; KEY_WIDTH]) -> String {
    format!("0x{}", hex::encode(key))
}

/// Shorthand for `key_hex(&fixed_key(text))`.
pub fn text_key_hex(text: &str) -> String {
    key_hex(&fixed_key(text))
}

/// Recovers the text of a hex key, dropping the zero padding.
///
/// Returns `None` if the input is not a 32-byte hex word.
pub fn key_text(hex_key: &str) -> Option<String> {
    let digits = hex_key.strip_prefix("0x").unwrap_or(hex_key);
    let bytes = hex::decode(digits).ok()?;
    if bytes.len() != KEY_WIDTH {
        return None;
    }
    let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    Some(String::from_utf8_lossy(&bytes[..end]).into_owned())
}

/// Text form of a key as it arrives in a descriptor.
///
/// 32-byte hex words are unpacked; anything else is kept as given.
pub fn plain_key(raw: &str) -> String {
    if raw.starts_with("0x") {
        if let Some(text) = key_text(raw) {
            return text;
        }
    }
    raw.to_string()
}
