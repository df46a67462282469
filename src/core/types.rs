//! Type aliases for domain concepts.

/// One CSV record: an ordered list of fields.
pub type Record = Vec<String>;

/// Full name of an entry inside a ZIP archive (e.g. `daily/report.txt`).
pub type EntryName = String;

/// Fingerprint of an OpenPGP key, uppercase hex.
pub type Fingerprint = String;
