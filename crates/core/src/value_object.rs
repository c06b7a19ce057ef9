//! Validated identifiers that come from the storefronts themselves.
//!
//! SKUs, inventory items, locations and shop domains are compared by their
//! normalised text. Parsing is the only way in, so a value that exists is valid.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Stock-keeping unit, unique within one storefront (not globally).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl Sku {
    pub fn parse(value: impl Into<String>) -> DomainResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The storefront's own identifier for a SKU's stock record.
///
/// Stored in its bare form (`"44521"`). Remote APIs may hand out global ids
/// (`gid://shopify/InventoryItem/44521`); both parse to the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteInventoryItemId(String);

impl RemoteInventoryItemId {
    const GID_KIND: &'static str = "InventoryItem";

    pub fn parse(value: impl Into<String>) -> DomainResult<Self> {
        strip_global_id(&value.into(), Self::GID_KIND)
            .map(Self)
            .ok_or_else(|| DomainError::invalid_id("inventory item id cannot be empty"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Global-id form expected by the remote mutation API.
    pub fn to_global_id(&self) -> String {
        global_id(Self::GID_KIND, &self.0)
    }
}

/// A storefront location that holds stock. Supplied per store, never hard-coded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocationId(String);

impl LocationId {
    const GID_KIND: &'static str = "Location";

    pub fn parse(value: impl Into<String>) -> DomainResult<Self> {
        strip_global_id(&value.into(), Self::GID_KIND)
            .map(Self)
            .ok_or_else(|| DomainError::invalid_id("location id cannot be empty"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_global_id(&self) -> String {
        global_id(Self::GID_KIND, &self.0)
    }
}

/// Storefront domain, e.g. `acme-eu.myshopify.com`.
///
/// A bare store handle (`acme-eu`) is expanded to the hosted domain. Stored
/// lower-case and without scheme or trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShopDomain(String);

impl ShopDomain {
    const HOSTED_SUFFIX: &'static str = ".myshopify.com";

    pub fn parse(value: impl Into<String>) -> DomainResult<Self> {
        let value = value.into();
        let mut domain = value.trim().to_ascii_lowercase();
        for scheme in ["https://", "http://"] {
            if let Some(rest) = domain.strip_prefix(scheme) {
                domain = rest.to_string();
            }
        }
        let domain = domain.trim_end_matches('/');

        if domain.is_empty() {
            return Err(DomainError::validation("shop domain cannot be empty"));
        }
        if domain.contains('/') || domain.contains(char::is_whitespace) {
            return Err(DomainError::validation(format!("invalid shop domain: {value}")));
        }

        if domain.contains('.') {
            Ok(Self(domain.to_string()))
        } else {
            Ok(Self(format!("{domain}{}", Self::HOSTED_SUFFIX)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! impl_string_value {
    ($t:ty) => {
        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl core::str::FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

impl_string_value!(Sku);
impl_string_value!(RemoteInventoryItemId);
impl_string_value!(LocationId);
impl_string_value!(ShopDomain);

fn global_id(kind: &str, id: &str) -> String {
    format!("gid://shopify/{kind}/{id}")
}

fn strip_global_id(value: &str, kind: &str) -> Option<String> {
    let value = value.trim();
    let prefix = format!("gid://shopify/{kind}/");
    let bare = value.strip_prefix(prefix.as_str()).unwrap_or(value);
    if bare.is_empty() {
        None
    } else {
        Some(bare.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sku_is_trimmed_and_non_empty() {
        assert_eq!(Sku::parse("  TSHIRT-RED-M ").unwrap().as_str(), "TSHIRT-RED-M");
        assert!(Sku::parse("   ").is_err());
    }

    #[test]
    fn inventory_item_id_accepts_bare_and_global_forms() {
        let bare = RemoteInventoryItemId::parse("44521").unwrap();
        let global = RemoteInventoryItemId::parse("gid://shopify/InventoryItem/44521").unwrap();
        assert_eq!(bare, global);
        assert_eq!(bare.to_global_id(), "gid://shopify/InventoryItem/44521");
    }

    #[test]
    fn location_id_renders_global_id() {
        let loc = LocationId::parse("105135735110").unwrap();
        assert_eq!(loc.to_global_id(), "gid://shopify/Location/105135735110");
        assert!(LocationId::parse("gid://shopify/Location/").is_err());
    }

    #[test]
    fn shop_domain_expands_handles_and_strips_scheme() {
        assert_eq!(ShopDomain::parse("Acme-EU").unwrap().as_str(), "acme-eu.myshopify.com");
        assert_eq!(
            ShopDomain::parse("https://acme-eu.myshopify.com/").unwrap().as_str(),
            "acme-eu.myshopify.com"
        );
        assert_eq!(ShopDomain::parse("shop.example.com").unwrap().as_str(), "shop.example.com");
        assert!(ShopDomain::parse("acme/../admin").is_err());
    }

    #[test]
    fn sku_deserialization_validates() {
        let ok: Sku = serde_json::from_str("\"A-1\"").unwrap();
        assert_eq!(ok.as_str(), "A-1");
        assert!(serde_json::from_str::<Sku>("\"\"").is_err());
    }

    proptest! {
        #[test]
        fn numeric_item_ids_survive_global_round_trip(n in 1u64..u64::MAX) {
            let id = RemoteInventoryItemId::parse(n.to_string()).unwrap();
            let again = RemoteInventoryItemId::parse(id.to_global_id()).unwrap();
            prop_assert_eq!(id, again);
        }
    }
}
