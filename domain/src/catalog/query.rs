//! Query catalog value object

use crate::core::error::DomainError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Request/response queries the server understands (Value Object)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
    /// Session handshake, sent once right after the connection opens
    Session,
    GetProperty,
    GetProperties,
    AddProperty,
    EditProperty,
    RemoveProperty,
    GetUser,
    GetUsers,
    AddUser,
    GetStatistics,
    GetPricing,
}

impl Query {
    /// Every catalog entry.
    pub const CATALOG: [Query; 11] = [
        Query::Session,
        Query::GetProperty,
        Query::GetProperties,
        Query::AddProperty,
        Query::EditProperty,
        Query::RemoveProperty,
        Query::GetUser,
        Query::GetUsers,
        Query::AddUser,
        Query::GetStatistics,
        Query::GetPricing,
    ];

    /// Query-type string as it appears in `{"type": ...}` on the wire
    pub fn wire_type(&self) -> &'static str {
        match self {
            Query::Session => "queries.session",
            Query::GetProperty => "queries.get-property",
            Query::GetProperties => "queries.get-properties",
            Query::AddProperty => "queries.add-property",
            Query::EditProperty => "queries.edit-property",
            Query::RemoveProperty => "queries.remove-property",
            Query::GetUser => "queries.get-user",
            Query::GetUsers => "queries.get-users",
            Query::AddUser => "queries.add-user",
            Query::GetStatistics => "queries.get-statistics",
            Query::GetPricing => "queries.get-pricing",
        }
    }

    /// Symbolic catalog name
    pub fn symbol(&self) -> &'static str {
        match self {
            Query::Session => "SESSION",
            Query::GetProperty => "GET_PROPERTY",
            Query::GetProperties => "GET_PROPERTIES",
            Query::AddProperty => "ADD_PROPERTY",
            Query::EditProperty => "EDIT_PROPERTY",
            Query::RemoveProperty => "REMOVE_PROPERTY",
            Query::GetUser => "GET_USER",
            Query::GetUsers => "GET_USERS",
            Query::AddUser => "ADD_USER",
            Query::GetStatistics => "GET_STATISTICS",
            Query::GetPricing => "GET_PRICING",
        }
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire_type())
    }
}

impl std::str::FromStr for Query {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::CATALOG
            .into_iter()
            .find(|q| q.wire_type() == s || q.symbol().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::UnknownQuery(s.to_string()))
    }
}

impl Serialize for Query {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.wire_type())
    }
}

impl<'de> Deserialize<'de> for Query {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
