/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Normalises a wallet address for comparison. Addresses are compared case-insensitively, so mixed-case checksum
/// encodings match their lowercase form.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}
