//! Test fixtures and constants.

/// Passphrase used for protected test keys.
pub const PASSPHRASE: &str = "tr0ub4dor&3";

/// Password used for encrypted archives.
pub const ZIP_PASSWORD: &str = "zip-secret";

/// Sample report content.
pub const SAMPLE_REPORT: &str = "quarterly report\nrevenue|42\n";

/// Sample CSV rows without the delimiter in any field.
pub const SAMPLE_ROWS: &[&[&str]] = &[
    &["id", "name", "amount"],
    &["1", "alice", "10.50"],
    &["2", "bob", "7"],
];

/// Bytes that are not valid UTF-8.
pub const BINARY_BLOB: &[u8] = &[0x00, 0xff, 0xfe, 0x80, 0x7f, 0x01];
