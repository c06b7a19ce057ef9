//! Postgres-backed store directory (`stores` table).
//!
//! A row authenticates either with `access_token` or with the
//! `api_key`/`api_secret` pair; a row with neither is reported as
//! misconfigured rather than skipped.

use std::sync::Arc;

use sqlx::{PgPool, Row};
use tracing::instrument;

use stocksync_core::{CompanyId, LocationId, ShopDomain, StoreId};
use stocksync_inventory::{Secret, Store, StoreAuth};

use super::{StoreDirectory, StoreDirectoryError};
use crate::db::describe_sqlx_error;

const STORE_COLUMNS: &str = "id, company_id, shop_domain, access_token, api_key, api_secret, webhook_secret, location_id";

#[derive(Debug, Clone)]
pub struct PostgresStoreDirectory {
    pool: Arc<PgPool>,
}

impl PostgresStoreDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreDirectoryError {
    StoreDirectoryError::Storage(describe_sqlx_error(operation, &err))
}

struct StoreRow {
    id: uuid::Uuid,
    company_id: uuid::Uuid,
    shop_domain: String,
    access_token: Option<String>,
    api_key: Option<String>,
    api_secret: Option<String>,
    webhook_secret: Option<String>,
    location_id: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoreRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoreRow {
            id: row.try_get("id")?,
            company_id: row.try_get("company_id")?,
            shop_domain: row.try_get("shop_domain")?,
            access_token: row.try_get("access_token")?,
            api_key: row.try_get("api_key")?,
            api_secret: row.try_get("api_secret")?,
            webhook_secret: row.try_get("webhook_secret")?,
            location_id: row.try_get("location_id")?,
        })
    }
}

impl TryFrom<StoreRow> for Store {
    type Error = StoreDirectoryError;

    fn try_from(row: StoreRow) -> Result<Self, Self::Error> {
        let store_id = StoreId::from_uuid(row.id);
        let misconfigured = |reason: String| StoreDirectoryError::Misconfigured { store_id, reason };
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let auth = match (
            non_empty(row.access_token),
            non_empty(row.api_key),
            non_empty(row.api_secret),
        ) {
            (Some(token), _, _) => StoreAuth::AccessToken {
                token: Secret::new(token),
            },
            (None, Some(key), Some(secret)) => StoreAuth::ApiKey {
                key,
                secret: Secret::new(secret),
            },
            _ => return Err(misconfigured("no access token or api key/secret".to_string())),
        };

        let location = non_empty(row.location_id).ok_or_else(|| misconfigured("no location id".to_string()))?;

        Ok(Store {
            id: store_id,
            company_id: CompanyId::from_uuid(row.company_id),
            domain: ShopDomain::parse(row.shop_domain).map_err(|e| misconfigured(e.to_string()))?,
            auth,
            webhook_secret: Secret::new(row.webhook_secret.unwrap_or_default()),
            location_id: LocationId::parse(location).map_err(|e| misconfigured(e.to_string()))?,
        })
    }
}

fn store_from_row(row: &sqlx::postgres::PgRow) -> Result<Store, StoreDirectoryError> {
    let raw = <StoreRow as sqlx::FromRow<_>>::from_row(row).map_err(|e| map_sqlx_error("decode_store", e))?;
    Store::try_from(raw)
}

#[async_trait::async_trait]
impl StoreDirectory for PostgresStoreDirectory {
    #[instrument(skip(self), fields(store_id = %store_id), err)]
    async fn get(&self, store_id: StoreId) -> Result<Option<Store>, StoreDirectoryError> {
        let row = sqlx::query(&format!("SELECT {STORE_COLUMNS} FROM stores WHERE id = $1"))
            .bind(store_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_store", e))?;

        row.as_ref().map(store_from_row).transpose()
    }

    #[instrument(skip(self), fields(domain = %domain), err)]
    async fn find_by_domain(&self, domain: &ShopDomain) -> Result<Option<Store>, StoreDirectoryError> {
        // Rows may hold either the bare handle or the full domain.
        let handle = domain.as_str().strip_suffix(".myshopify.com").unwrap_or(domain.as_str());
        let rows = sqlx::query(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE lower(shop_domain) IN ($1, $2) ORDER BY id"
        ))
        .bind(domain.as_str())
        .bind(handle)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_store_by_domain", e))?;

        rows.first().map(store_from_row).transpose()
    }

    #[instrument(skip(self), fields(company_id = %company_id), err)]
    async fn list_for_company(&self, company_id: CompanyId) -> Result<Vec<Store>, StoreDirectoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE company_id = $1 ORDER BY id"
        ))
        .bind(company_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_company_stores", e))?;

        rows.iter().map(store_from_row).collect()
    }
}
