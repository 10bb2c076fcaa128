//! Provider-specific notification address formats

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Address format accepted by a push provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressFormat {
    /// Expo push token: `ExponentPushToken[...]`, `ExpoPushToken[...]` or bare UUID
    #[default]
    Expo,
    /// Any non-empty token without whitespace
    Opaque,
}

impl AddressFormat {
    /// Check an address against this format
    pub fn is_valid(&self, address: &str) -> bool {
        match self {
            Self::Expo => is_expo_push_token(address),
            Self::Opaque => !address.is_empty() && !address.chars().any(char::is_whitespace),
        }
    }

    /// Validate an address, returning `InvalidAddress` on mismatch
    pub fn validate(&self, address: &str) -> Result<(), ContractError> {
        if address.trim().is_empty() {
            return Err(ContractError::invalid_address(address, "address is required"));
        }
        if !self.is_valid(address) {
            let message = match self {
                Self::Expo => "not an Expo push token",
                Self::Opaque => "address must not contain whitespace",
            };
            return Err(ContractError::invalid_address(address, message));
        }
        Ok(())
    }
}

fn is_expo_push_token(token: &str) -> bool {
    let bracketed = (token.starts_with("ExponentPushToken[") || token.starts_with("ExpoPushToken["))
        && token.ends_with(']');
    bracketed || is_uuid_like(token)
}

/// `8-4-4-4-12` alphanumeric groups, case-insensitive
fn is_uuid_like(token: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

    let parts: Vec<&str> = token.split('-').collect();
    parts.len() == GROUPS.len()
        && parts
            .iter()
            .zip(GROUPS)
            .all(|(part, len)| part.len() == len && part.chars().all(|c| c.is_ascii_alphanumeric()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expo_bracketed_tokens() {
        let format = AddressFormat::Expo;
        assert!(format.is_valid("ExponentPushToken[xxxxxxxxxxxxxxxxxxxxxx]"));
        assert!(format.is_valid("ExpoPushToken[abc]"));
        assert!(!format.is_valid("ExponentPushToken[abc"));
        assert!(!format.is_valid("tok-A"));
    }

    #[test]
    fn test_expo_uuid_tokens() {
        let format = AddressFormat::Expo;
        assert!(format.is_valid("F5741A13-BCDA-434B-A316-5DC0E6FFA94F"));
        assert!(!format.is_valid("F5741A13-BCDA-434B-A316"));
        assert!(!format.is_valid("F5741A13-BCDA-434B-A316-5DC0E6FFA9_F"));
    }

    #[test]
    fn test_opaque_tokens() {
        let format = AddressFormat::Opaque;
        assert!(format.is_valid("tok-A"));
        assert!(!format.is_valid(""));
        assert!(!format.is_valid("tok A"));
    }

    #[test]
    fn test_validate_reports_reason() {
        let err = AddressFormat::Expo.validate("nope").unwrap_err();
        assert!(matches!(err, ContractError::InvalidAddress { .. }));
        assert!(err.to_string().contains("Expo push token"));

        let err = AddressFormat::Opaque.validate("   ").unwrap_err();
        assert!(err.to_string().contains("required"));
    }
}
