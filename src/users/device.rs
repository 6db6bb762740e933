use lazy_static::lazy_static;
use regex::Regex;

/// A device identifier is a 256-bit fingerprint: exactly 64 hex characters.
pub fn is_valid_device_id(id: &str) -> bool {
    lazy_static! {
        static ref DEVICE_RE: Regex = Regex::new(r"^[0-9a-fA-F]{64}$").unwrap();
    }
    DEVICE_RE.is_match(id)
}

/// Canonical form used for every comparison and storage operation: separators
/// stripped, upper-cased. Idempotent.
pub fn normalize_device_id(id: &str) -> String {
    id.replace([':', '-'], "").to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex64() -> String {
        "a1b2c3d4".repeat(8)
    }

    #[test]
    fn accepts_64_hex_characters() {
        assert!(is_valid_device_id(&hex64()));
        assert!(is_valid_device_id(&hex64().to_uppercase()));
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(!is_valid_device_id(&hex64()[..63]));
        assert!(!is_valid_device_id(&format!("{}0", hex64())));
        assert!(!is_valid_device_id(""));
    }

    #[test]
    fn rejects_non_hex_characters() {
        let mut id = hex64();
        id.replace_range(0..1, "g");
        assert!(!is_valid_device_id(&id));
        assert!(!is_valid_device_id(&"zz".repeat(32)));
    }

    #[test]
    fn rejects_mac_address_shapes() {
        assert!(!is_valid_device_id("AA:BB:CC:DD:EE:FF"));
        assert!(!is_valid_device_id("aa-bb-cc-dd-ee-ff"));
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_device_id("a1:b2-c3d4");
        assert_eq!(normalize_device_id(&once), once);
    }

    #[test]
    fn comparison_is_case_and_separator_insensitive() {
        let canonical = normalize_device_id(&hex64());
        assert_eq!(normalize_device_id(&hex64().to_uppercase()), canonical);
        let separated = hex64()
            .as_bytes()
            .chunks(2)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join(":");
        assert_eq!(normalize_device_id(&separated), canonical);
    }
}
