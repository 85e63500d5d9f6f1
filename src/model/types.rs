//! Foundation types for the merge core.
//!
//! Object identifiers, branch names, index stages, file modes, and commit
//! signatures. Identifier newtypes validate on construction so the rest of
//! the engine never handles malformed hashes or names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// Which identifier kind failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    ObjectId,
    BranchName,
}

/// A string failed validation for one of the identifier newtypes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    /// The identifier kind that rejected the value.
    pub kind: ErrorKind,
    /// The rejected value.
    pub value: String,
    /// Why the value is invalid.
    pub reason: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            ErrorKind::ObjectId => "object id",
            ErrorKind::BranchName => "branch name",
        };
        write!(f, "invalid {what} {:?}: {}", self.value, self.reason)
    }
}

impl std::error::Error for ValidationError {}

// ---------------------------------------------------------------------------
// ObjectId
// ---------------------------------------------------------------------------

/// A validated 40-character lowercase hex object identifier.
///
/// Identifies blobs, trees, and commits in the object store. The all-zeros
/// id ([`ObjectId::zero`]) is a placeholder meaning "no object": it marks
/// the absent side of a conflict (e.g. the base slot of an add/add).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Hex length of an object id.
    pub const LEN: usize = 40;

    /// Create a new `ObjectId` from a string, validating format.
    ///
    /// # Errors
    /// Returns an error if the string is not exactly 40 lowercase hex
    /// characters.
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        Self::validate(s)?;
        Ok(Self(s.to_owned()))
    }

    /// The all-zeros placeholder id.
    #[must_use]
    pub fn zero() -> Self {
        Self("0".repeat(Self::LEN))
    }

    /// Returns `true` if this is the all-zeros placeholder.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.bytes().all(|b| b == b'0')
    }

    /// Content-address arbitrary bytes: SHA-256 truncated to 160 bits.
    #[must_use]
    pub fn for_bytes(data: &[u8]) -> Self {
        use fmt::Write as _;

        let digest = Sha256::digest(data);
        let mut hex = String::with_capacity(Self::LEN);
        for byte in &digest[..20] {
            let _ = write!(hex, "{byte:02x}");
        }
        Self(hex)
    }

    /// Content-address a blob.
    ///
    /// Blobs are domain-separated from trees and commits so that a blob
    /// whose bytes happen to equal an encoded tree never collides with it.
    #[must_use]
    pub fn for_blob(data: &[u8]) -> Self {
        let mut prefixed = Vec::with_capacity(data.len() + 5);
        prefixed.extend_from_slice(b"blob\0");
        prefixed.extend_from_slice(data);
        Self::for_bytes(&prefixed)
    }

    /// Return the inner hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated 8-character form for log output.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..8]
    }

    fn validate(s: &str) -> Result<(), ValidationError> {
        if s.len() != Self::LEN {
            return Err(ValidationError {
                kind: ErrorKind::ObjectId,
                value: s.to_owned(),
                reason: format!("expected {} hex characters, got {}", Self::LEN, s.len()),
            });
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        {
            return Err(ValidationError {
                kind: ErrorKind::ObjectId,
                value: s.to_owned(),
                reason: "must contain only lowercase hex characters (0-9, a-f)".to_owned(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectId {
    type Err = ValidationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ObjectId {
    type Error = ValidationError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::validate(&s)?;
        Ok(Self(s))
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// BranchName
// ---------------------------------------------------------------------------

/// A validated branch name.
///
/// Branch names are 1–255 characters of lowercase alphanumerics, `-`, `_`,
/// `.`, and `/`; they must not start or end with a hyphen and must not
/// contain `..`. Examples: `main`, `topic`, `feature/auth`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// The maximum length of a branch name.
    pub const MAX_LEN: usize = 255;

    /// Create a new `BranchName` from a string, validating format.
    ///
    /// # Errors
    /// Returns an error if the name is empty, too long, or contains invalid
    /// characters.
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        Self::validate(s)?;
        Ok(Self(s.to_owned()))
    }

    /// Return the branch name as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The short display form used in merge messages (`Merge branch '<x>'`).
    ///
    /// Plain names are their own short form; a `heads/`-qualified name is
    /// shortened to its final segment group.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.strip_prefix("heads/").unwrap_or(&self.0)
    }

    fn validate(s: &str) -> Result<(), ValidationError> {
        if s.is_empty() {
            return Err(ValidationError {
                kind: ErrorKind::BranchName,
                value: s.to_owned(),
                reason: "branch name must not be empty".to_owned(),
            });
        }
        if s.len() > Self::MAX_LEN {
            return Err(ValidationError {
                kind: ErrorKind::BranchName,
                value: s.to_owned(),
                reason: format!(
                    "branch name must be at most {} characters, got {}",
                    Self::MAX_LEN,
                    s.len()
                ),
            });
        }
        if s.starts_with('-') || s.ends_with('-') {
            return Err(ValidationError {
                kind: ErrorKind::BranchName,
                value: s.to_owned(),
                reason: "branch name must not start or end with a hyphen".to_owned(),
            });
        }
        if s.contains("..") {
            return Err(ValidationError {
                kind: ErrorKind::BranchName,
                value: s.to_owned(),
                reason: "branch name must not contain '..'".to_owned(),
            });
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "-_./".contains(c))
        {
            return Err(ValidationError {
                kind: ErrorKind::BranchName,
                value: s.to_owned(),
                reason:
                    "branch name must contain only lowercase letters, digits, and -_./ characters"
                        .to_owned(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BranchName {
    type Err = ValidationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for BranchName {
    type Error = ValidationError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::validate(&s)?;
        Ok(Self(s))
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// The stage tag of an index entry.
///
/// Merged content uses stage 0; an unresolved conflict is encoded as up to
/// three entries at stages 1–3 for the same path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Resolved content (stage 0).
    Merged,
    /// The common-ancestor side of a conflict (stage 1).
    Ancestor,
    /// Our side of a conflict (stage 2).
    Ours,
    /// Their side of a conflict (stage 3).
    Theirs,
}

impl Stage {
    /// The numeric stage value as stored in index formats.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Merged => 0,
            Self::Ancestor => 1,
            Self::Ours => 2,
            Self::Theirs => 3,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Merged => write!(f, "merged"),
            Self::Ancestor => write!(f, "ancestor"),
            Self::Ours => write!(f, "ours"),
            Self::Theirs => write!(f, "theirs"),
        }
    }
}

// ---------------------------------------------------------------------------
// FileMode
// ---------------------------------------------------------------------------

/// The mode of a tree or index entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileMode {
    /// A regular file.
    Regular,
    /// An executable file.
    Executable,
    /// A symbolic link (target stored as blob content).
    Symlink,
}

impl FileMode {
    /// Octal representation used in canonical encodings.
    #[must_use]
    pub const fn octal(self) -> &'static str {
        match self {
            Self::Regular => "100644",
            Self::Executable => "100755",
            Self::Symlink => "120000",
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.octal())
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// Author or committer identity on a commit.
///
/// `time` is unix seconds; the authored time drives the merge-base walker's
/// priority ordering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Unix timestamp in seconds.
    pub time: i64,
}

impl Signature {
    /// Create a new signature.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>, time: i64) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            time,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> {}", self.name, self.email, self.time)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- ObjectId --

    #[test]
    fn object_id_valid() {
        let id = ObjectId::new(&"a".repeat(40)).unwrap();
        assert_eq!(id.as_str(), "a".repeat(40));
    }

    #[test]
    fn object_id_rejects_wrong_length() {
        let err = ObjectId::new("abc").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ObjectId);
        assert!(err.reason.contains("40 hex characters"));
    }

    #[test]
    fn object_id_rejects_uppercase() {
        let err = ObjectId::new(&"A".repeat(40)).unwrap_err();
        assert!(err.reason.contains("lowercase"));
    }

    #[test]
    fn object_id_rejects_non_hex() {
        assert!(ObjectId::new(&"g".repeat(40)).is_err());
    }

    #[test]
    fn object_id_zero() {
        let zero = ObjectId::zero();
        assert!(zero.is_zero());
        assert_eq!(zero.as_str().len(), 40);
        assert!(!ObjectId::new(&"1".repeat(40)).unwrap().is_zero());
    }

    #[test]
    fn object_id_for_bytes_is_deterministic() {
        let a = ObjectId::for_bytes(b"hello");
        let b = ObjectId::for_bytes(b"hello");
        assert_eq!(a, b);
        assert_ne!(a, ObjectId::for_bytes(b"world"));
        assert_eq!(a.as_str().len(), 40);
    }

    #[test]
    fn object_id_blob_domain_separated() {
        assert_ne!(ObjectId::for_blob(b"x"), ObjectId::for_bytes(b"x"));
    }

    #[test]
    fn object_id_short() {
        let id = ObjectId::new(&"abcd".repeat(10)).unwrap();
        assert_eq!(id.short(), "abcdabcd");
    }

    #[test]
    fn object_id_serde_roundtrip() {
        let id = ObjectId::new(&"b".repeat(40)).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", "b".repeat(40)));
        let decoded: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, id);
    }

    #[test]
    fn object_id_serde_rejects_invalid() {
        let result: Result<ObjectId, _> = serde_json::from_str("\"not-hex\"");
        assert!(result.is_err());
    }

    // -- BranchName --

    #[test]
    fn branch_name_valid() {
        for name in ["main", "topic", "feature/auth", "v1.2", "wip_stuff"] {
            assert!(BranchName::new(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn branch_name_invalid() {
        for name in ["", "-lead", "trail-", "UPPER", "a b", "dots..inside"] {
            assert!(BranchName::new(name).is_err(), "{name} should be invalid");
        }
    }

    #[test]
    fn branch_name_too_long() {
        let err = BranchName::new(&"a".repeat(256)).unwrap_err();
        assert!(err.reason.contains("at most 255"));
    }

    #[test]
    fn branch_name_short_form() {
        assert_eq!(BranchName::new("topic").unwrap().short(), "topic");
        assert_eq!(BranchName::new("heads/topic").unwrap().short(), "topic");
    }

    #[test]
    fn branch_name_serde_roundtrip() {
        let name = BranchName::new("feature/x").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        let decoded: BranchName = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, name);
    }

    // -- Stage --

    #[test]
    fn stage_numbers() {
        assert_eq!(Stage::Merged.number(), 0);
        assert_eq!(Stage::Ancestor.number(), 1);
        assert_eq!(Stage::Ours.number(), 2);
        assert_eq!(Stage::Theirs.number(), 3);
    }

    #[test]
    fn stage_ordering_matches_numbers() {
        assert!(Stage::Merged < Stage::Ancestor);
        assert!(Stage::Ancestor < Stage::Ours);
        assert!(Stage::Ours < Stage::Theirs);
    }

    #[test]
    fn stage_serde_snake_case() {
        assert_eq!(serde_json::to_string(&Stage::Ancestor).unwrap(), "\"ancestor\"");
        let decoded: Stage = serde_json::from_str("\"theirs\"").unwrap();
        assert_eq!(decoded, Stage::Theirs);
    }

    // -- FileMode --

    #[test]
    fn file_mode_octal() {
        assert_eq!(FileMode::Regular.octal(), "100644");
        assert_eq!(FileMode::Executable.octal(), "100755");
        assert_eq!(FileMode::Symlink.octal(), "120000");
    }

    // -- Signature --

    #[test]
    fn signature_display() {
        let sig = Signature::new("Alice", "alice@example.com", 1_700_000_000);
        assert_eq!(format!("{sig}"), "Alice <alice@example.com> 1700000000");
    }

    #[test]
    fn signature_serde_roundtrip() {
        let sig = Signature::new("Bob", "bob@example.com", 42);
        let json = serde_json::to_string(&sig).unwrap();
        let decoded: Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, sig);
    }

    // -- ValidationError --

    #[test]
    fn validation_error_display() {
        let err = ObjectId::new("xyz").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("object id"));
        assert!(msg.contains("xyz"));
    }
}
