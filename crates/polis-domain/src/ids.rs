//! Identifier types - surrogate policy keys and owner identities

use std::fmt;

/// Unique identifier for a stored policy based on UUIDv7
///
/// UUIDv7 provides:
/// - Chronological sortability (newer policies sort last)
/// - 128-bit uniqueness without coordination between writers
/// - A standard textual form for the CLI and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PolicyId(u128);

impl PolicyId {
    /// Generate a new UUIDv7-based PolicyId
    ///
    /// # Examples
    ///
    /// ```
    /// use polis_domain::PolicyId;
    ///
    /// let id = PolicyId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a PolicyId from a raw u128 value
    ///
    /// This is primarily for storage layer deserialization.
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a PolicyId from its UUID string form
    ///
    /// # Examples
    ///
    /// ```
    /// use polis_domain::PolicyId;
    ///
    /// let id = PolicyId::new();
    /// let parsed = PolicyId::from_string(&id.to_string()).unwrap();
    /// assert_eq!(id, parsed);
    /// ```
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid policy id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }

    /// Big-endian byte form used as the storage key
    pub fn to_bytes(&self) -> [u8; 16] {
        self.0.to_be_bytes()
    }

    /// Rebuild a PolicyId from its storage key
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        let arr: [u8; 16] = bytes
            .try_into()
            .map_err(|_| format!("Expected 16 bytes for PolicyId, got {}", bytes.len()))?;
        Ok(Self(u128::from_be_bytes(arr)))
    }
}

impl Default for PolicyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Identity of the account that owns a policy
///
/// Always non-empty and trimmed; there is no way to build an empty one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OwnerId(String);

impl OwnerId {
    /// Build an owner identity, rejecting blank input
    ///
    /// # Examples
    ///
    /// ```
    /// use polis_domain::OwnerId;
    ///
    /// assert_eq!(OwnerId::parse("  user-42 ").unwrap().as_str(), "user-42");
    /// assert!(OwnerId::parse("   ").is_none());
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Borrow the identity as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for OwnerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| "Owner identity cannot be empty".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_id_ordering() {
        let id1 = PolicyId::from_value(1000);
        let id2 = PolicyId::from_value(2000);

        assert!(id1 < id2);
    }

    #[test]
    fn test_policy_id_chronological() {
        let id1 = PolicyId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = PolicyId::new();

        assert!(id1 < id2, "Earlier UUIDv7 should sort before later UUIDv7");
    }

    #[test]
    fn test_policy_id_display_and_parse() {
        let id = PolicyId::new();
        let id_str = id.to_string();
        assert_eq!(id_str.len(), 36);
        assert_eq!(PolicyId::from_string(&id_str).unwrap(), id);
    }

    #[test]
    fn test_policy_id_bytes() {
        let id = PolicyId::new();
        assert_eq!(PolicyId::from_bytes(&id.to_bytes()).unwrap(), id);
        assert!(PolicyId::from_bytes(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_policy_id_invalid_string() {
        assert!(PolicyId::from_string("not-a-valid-uuid").is_err());
        assert!(PolicyId::from_string("").is_err());
    }

    #[test]
    fn test_owner_id_rejects_blank() {
        assert!(OwnerId::parse("").is_none());
        assert!(OwnerId::parse(" \t ").is_none());
        assert!("".parse::<OwnerId>().is_err());
    }
}
