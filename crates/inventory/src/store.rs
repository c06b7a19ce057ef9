use serde::{Deserialize, Serialize, Serializer};

use stocksync_core::{CompanyId, LocationId, ShopDomain, StoreId};

/// A secret string. `Debug` and serialised output are redacted; only
/// `expose` hands out the value.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Debug for Secret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

/// How the remote admin API authenticates requests for one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum StoreAuth {
    /// Access token sent in the storefront's token header.
    AccessToken { token: Secret },
    /// API key/secret pair sent as HTTP basic auth.
    ApiKey { key: String, secret: Secret },
}

/// Everything the remote client needs to reach one store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCredentials {
    pub store_id: StoreId,
    pub domain: ShopDomain,
    pub auth: StoreAuth,
}

/// An integrated storefront.
///
/// Owned and managed by an external collaborator; the sync engine only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub company_id: CompanyId,
    pub domain: ShopDomain,
    pub auth: StoreAuth,
    /// Shared secret used to sign webhooks sent by this store.
    pub webhook_secret: Secret,
    /// Location whose stock is adjusted when siblings sell.
    pub location_id: LocationId,
}

impl Store {
    pub fn remote_credentials(&self) -> RemoteCredentials {
        RemoteCredentials {
            store_id: self.id,
            domain: self.domain.clone(),
            auth: self.auth.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store {
            id: StoreId::new(),
            company_id: CompanyId::new(),
            domain: ShopDomain::parse("acme").unwrap(),
            auth: StoreAuth::AccessToken {
                token: Secret::new("shpat_live_token"),
            },
            webhook_secret: Secret::new("whsec_value"),
            location_id: LocationId::parse("1").unwrap(),
        }
    }

    #[test]
    fn secrets_never_show_in_debug_output() {
        let store = store();
        let rendered = format!("{store:?}");
        assert!(!rendered.contains("shpat_live_token"));
        assert!(!rendered.contains("whsec_value"));
        assert_eq!(store.remote_credentials().domain.as_str(), "acme.myshopify.com");
    }

    #[test]
    fn secrets_are_redacted_when_serialised() {
        let store = store();
        let json = serde_json::to_value(&store).unwrap();

        assert_eq!(json["webhook_secret"], "[REDACTED]");
        assert_eq!(json["auth"]["kind"], "access_token");
        assert_eq!(json["auth"]["token"], "[REDACTED]");
        let rendered = json.to_string();
        assert!(!rendered.contains("shpat_live_token"));
        assert!(!rendered.contains("whsec_value"));
    }

    #[test]
    fn secrets_still_deserialise_from_plain_strings() {
        let secret: Secret = serde_json::from_str(r#""whsec_value""#).unwrap();
        assert_eq!(secret.expose(), "whsec_value");
    }
}
