//! Routing id layout
//!
//! ```text
//!  63      56 55      48 47                                   0
//! +----------+----------+--------------------------------------+
//! |   node   |   zone   |                 user                 |
//! +----------+----------+--------------------------------------+
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

const NODE_SHIFT: u32 = 56;
const ZONE_SHIFT: u32 = 48;
const USER_MASK: u64 = (1 << ZONE_SHIFT) - 1;

/// 64-bit connection identifier carrying node, zone and user sub-fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutingId(u64);

impl RoutingId {
    /// Compose an id; `user` is truncated to its low 48 bits
    #[must_use]
    pub const fn new(node: u8, zone: u8, user: u64) -> Self {
        Self(((node as u64) << NODE_SHIFT) | ((zone as u64) << ZONE_SHIFT) | (user & USER_MASK))
    }

    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn node(self) -> u8 {
        (self.0 >> NODE_SHIFT) as u8
    }

    /// Shard selector
    #[must_use]
    pub const fn zone(self) -> u8 {
        ((self.0 >> ZONE_SHIFT) & 0xFF) as u8
    }

    #[must_use]
    pub const fn user(self) -> u64 {
        self.0 & USER_MASK
    }
}

impl From<u64> for RoutingId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<RoutingId> for u64 {
    fn from(id: RoutingId) -> Self {
        id.0
    }
}

impl fmt::Display for RoutingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_extraction() {
        let id = RoutingId::from_raw(0x02FF_0000_0000_0001);
        assert_eq!(id.node(), 0x02);
        assert_eq!(id.zone(), 0xFF);
        assert_eq!(id.user(), 1);
    }

    #[test]
    fn test_new_packs_fields() {
        let id = RoutingId::new(3, 17, 123_456);
        assert_eq!(id.node(), 3);
        assert_eq!(id.zone(), 17);
        assert_eq!(id.user(), 123_456);
        assert_eq!(id.as_u64(), (3 << 56) | (17 << 48) | 123_456);
    }

    #[test]
    fn test_user_is_truncated() {
        let id = RoutingId::new(0, 1, u64::MAX);
        assert_eq!(id.zone(), 1);
        assert_eq!(id.user(), USER_MASK);
    }

    #[test]
    fn test_display_is_hex() {
        assert_eq!(
            RoutingId::from_raw(0x02FF_0000_0000_0001).to_string(),
            "0x02ff000000000001"
        );
    }

    #[test]
    fn test_serde_transparent() {
        let id = RoutingId::new(1, 2, 3);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, id.as_u64().to_string());
        assert_eq!(serde_json::from_str::<RoutingId>(&json).unwrap(), id);
    }
}
