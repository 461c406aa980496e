//! Reversible credential obfuscation.
//!
//! This is NOT cryptographic security. The keystream is a constant
//! application string plus a 4-digit salt embedded in the output, so
//! anyone with this source can reverse it. It exists to keep raw keys
//! out of casual disk and log scraping, nothing more.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::Rng;

const APP_SECRET: &str = "TradrXBridge2025";
const SALT_LEN: usize = 4;

/// Obfuscate `plain` with a fresh random salt. Output layout, before
/// the double base64 pass: `salt (4 digits) + plain`, XOR-ed against
/// `APP_SECRET + salt` repeated.
pub fn encode(plain: &str) -> String {
    let salt: u16 = rand::rng().random_range(0..10_000);
    encode_with_salt(plain, &format!("{salt:04}"))
}

fn encode_with_salt(plain: &str, salt: &str) -> String {
    let key: Vec<u8> = format!("{APP_SECRET}{salt}").into_bytes();
    let data: Vec<u8> = format!("{salt}{plain}").into_bytes();

    let xored: Vec<u8> = data
        .iter()
        .enumerate()
        .map(|(i, b)| b ^ key[i % key.len()])
        .collect();

    BASE64.encode(BASE64.encode(xored))
}

/// Reverse [`encode`]. Returns `None` for anything that is not a valid
/// product of this module (wrong encoding, truncated salt, foreign
/// data); callers degrade that to "not configured".
pub fn decode(obfuscated: &str) -> Option<String> {
    let once = BASE64.decode(obfuscated).ok()?;
    let xored = BASE64.decode(once).ok()?;
    if xored.len() < SALT_LEN {
        return None;
    }

    // The salt XORs against the first 4 key bytes, which are the
    // constant prefix, so it can be recovered before the full key is
    // known.
    let prefix = APP_SECRET.as_bytes();
    let salt_bytes: Vec<u8> = xored[..SALT_LEN]
        .iter()
        .enumerate()
        .map(|(i, b)| b ^ prefix[i])
        .collect();
    let salt = String::from_utf8(salt_bytes).ok()?;
    if salt.len() != SALT_LEN || !salt.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let key: Vec<u8> = format!("{APP_SECRET}{salt}").into_bytes();
    let plain_bytes: Vec<u8> = xored[SALT_LEN..]
        .iter()
        .enumerate()
        .map(|(i, b)| b ^ key[(i + SALT_LEN) % key.len()])
        .collect();

    String::from_utf8(plain_bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        for plain in [
            "A1b2C3d4E5f6G7h8A1b2C3d4E5f6G7h8",
            "short",
            "with spaces and $ymbols!",
            "",
        ] {
            let encoded = encode(plain);
            assert_eq!(decode(&encoded).as_deref(), Some(plain));
        }
    }

    #[test]
    fn distinct_salts_produce_distinct_output() {
        let a = encode_with_salt("samekey", "0001");
        let b = encode_with_salt("samekey", "9999");
        assert_ne!(a, b);
        assert_eq!(decode(&a).as_deref(), Some("samekey"));
        assert_eq!(decode(&b).as_deref(), Some("samekey"));
    }

    #[test]
    fn garbage_decodes_to_none() {
        assert_eq!(decode("not base64 at all!!"), None);
        assert_eq!(decode(""), None);
        // Valid base64 but not double-encoded output.
        assert_eq!(decode(&BASE64.encode("plain text")), None);
    }

    #[test]
    fn tampered_payload_decodes_to_none_or_differs() {
        let encoded = encode("A1b2C3d4E5f6G7h8A1b2C3d4E5f6G7h8");
        let mut tampered = encoded.into_bytes();
        tampered[0] = if tampered[0] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(tampered).unwrap();
        // Either the decode fails outright or it no longer matches.
        if let Some(out) = decode(&tampered) {
            assert_ne!(out, "A1b2C3d4E5f6G7h8A1b2C3d4E5f6G7h8");
        }
    }
}
