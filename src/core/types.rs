use std::{collections::HashSet, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Eq)]
pub struct Scope(HashSet<String>);

impl Scope {
    pub fn from_delimited_parts(parts: &str) -> Self {
        let parts = parts
            .split(' ')
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect();
        Self(parts)
    }

    pub fn as_joined(&self) -> String {
        let mut parts = self.as_parts();
        parts.sort();
        parts.join(" ")
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(scope)
    }

    pub fn as_parts(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let parts = String::deserialize(deserializer)?;
        Ok(Self::from_delimited_parts(&parts))
    }
}

impl Serialize for Scope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let joined = self.as_joined();
        serializer.serialize_str(&joined)
    }
}

/// Opaque identifier of a pending authorization transaction.
#[derive(Clone, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl FromStr for TransactionId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl AsRef<str> for TransactionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Consumer key, as stored in a transaction and handed to the client lookup.
#[derive(Clone, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl FromStr for ClientId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl AsRef<str> for ClientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// "oob" is a legal value, so this is not parsed as a URL.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct CallbackUrl(pub String);

impl AsRef<str> for CallbackUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct Token(pub String);

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_ignores_repeated_separators() {
        let scope = Scope::from_delimited_parts("read  write ");
        assert!(scope.contains("read"));
        assert!(scope.contains("write"));
        assert_eq!(scope.as_parts().len(), 2);
    }

    #[test]
    fn scope_equality_is_order_independent() {
        let lhs = Scope::from_delimited_parts("write read");
        let rhs = Scope::from_delimited_parts("read write");
        assert_eq!(lhs, rhs);
        assert_eq!(lhs.as_joined(), "read write");
    }

    #[test]
    fn scope_serializes_as_joined_string() {
        let scope: Scope = serde_json::from_str("\"write\"").unwrap();
        assert_eq!(serde_json::to_string(&scope).unwrap(), "\"write\"");
    }

    #[test]
    fn out_of_band_callback_is_kept_verbatim() {
        let cb: CallbackUrl = serde_json::from_str("\"oob\"").unwrap();
        assert_eq!(cb.as_ref(), "oob");
    }
}
