//! One-off catalogue backfill for every store of a company.
//!
//! `COMPANY_ID=<uuid> stocksync-backfill`

use std::sync::Arc;

use anyhow::Context;

use stocksync_api::app::Repositories;
use stocksync_core::CompanyId;
use stocksync_infra::{Backfill, GraphqlInventoryClient, SyncConfig};
use stocksync_observability::Logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = SyncConfig::from_env().context("invalid configuration")?;
    stocksync_observability::init_with(config.log_format);

    let company_id = std::env::var("COMPANY_ID").context("COMPANY_ID must be set")?;
    let company_id = uuid::Uuid::parse_str(company_id.trim())
        .map(CompanyId::from_uuid)
        .with_context(|| format!("COMPANY_ID '{company_id}' is not a uuid"))?;

    if config.database_url.is_none() {
        anyhow::bail!("DATABASE_URL must be set; an in-memory backfill would be discarded");
    }

    let logger = Logger::current();
    let repositories = Repositories::from_config(&config).await?;
    let remote = GraphqlInventoryClient::new(config.remote.clone(), logger.clone())?;
    let backfill = Backfill::new(repositories.stores, repositories.records, Arc::new(remote), logger);

    let report = backfill.run_company(company_id).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    let failed = report.failed_stores().count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} stores failed to backfill", report.stores.len());
    }
    Ok(())
}
