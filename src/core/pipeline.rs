use chrono::Utc;
use std::sync::Arc;

use crate::adapters::cinc::{CincClient, LeadEvent};
use crate::config::settings::{ConvertSettings, UploadSettings};
use crate::core::deliver::{deliver_all, write_failures_csv};
use crate::core::mapping::{convert, write_csv};
use crate::core::reader::parse_leads;
use crate::core::{LeadBatch, Pipeline, RunSummary, Storage};
use crate::domain::model::{CincTable, FailedLead};
use crate::utils::error::Result;

/// Real Intent CSV -> CINC 匯入 CSV
pub struct ConvertPipeline<S: Storage> {
    storage: S,
    settings: ConvertSettings,
}

impl<S: Storage> ConvertPipeline<S> {
    pub fn new(storage: S, settings: ConvertSettings) -> Self {
        Self { storage, settings }
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for ConvertPipeline<S> {
    type Output = (usize, CincTable);

    async fn extract(&self) -> Result<LeadBatch> {
        let data = self.storage.read_file(&self.settings.input).await?;
        parse_leads(&data)
    }

    async fn transform(&self, batch: LeadBatch) -> Result<Self::Output> {
        let table = convert(&batch, &self.settings.assignments);
        tracing::debug!("CINC columns: {}", table.headers.join(", "));
        Ok((batch.len(), table))
    }

    async fn load(&self, output: Self::Output) -> Result<RunSummary> {
        let (input_rows, table) = output;
        let data = write_csv(&table)?;
        self.storage.write_file(&self.settings.output, &data).await?;

        Ok(RunSummary {
            input_rows,
            processed_rows: table.rows.len(),
            failed_rows: 0,
            output_path: Some(self.settings.output.clone()),
        })
    }
}

/// 直接透過 CINC API 上傳
pub struct UploadPipeline<S: Storage> {
    storage: S,
    settings: UploadSettings,
    client: Arc<CincClient>,
}

impl<S: Storage> UploadPipeline<S> {
    /// 先確認憑證有效，無效時直接失敗
    pub async fn connect(storage: S, settings: UploadSettings, mut client: CincClient) -> Result<Self> {
        client.verify_credentials().await?;
        Ok(Self {
            storage,
            settings,
            client: Arc::new(client),
        })
    }

    async fn write_failures(&self, failed: &[FailedLead]) -> Result<Option<String>> {
        let Some(path) = &self.settings.failures_out else {
            return Ok(None);
        };
        if failed.is_empty() {
            return Ok(None);
        }
        self.storage
            .write_file(path, &write_failures_csv(failed)?)
            .await?;
        tracing::warn!("📝 {} failed leads written to {}", failed.len(), path);
        Ok(Some(path.clone()))
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for UploadPipeline<S> {
    type Output = Vec<LeadEvent>;

    async fn extract(&self) -> Result<LeadBatch> {
        let data = self.storage.read_file(&self.settings.input).await?;
        parse_leads(&data)
    }

    async fn transform(&self, batch: LeadBatch) -> Result<Self::Output> {
        let now = Utc::now();
        Ok(batch
            .leads
            .iter()
            .map(|lead| {
                tracing::trace!("Preparing lead {}", lead.label());
                LeadEvent::from_lead(lead, &self.settings.assignments, now)
            })
            .collect())
    }

    async fn load(&self, events: Self::Output) -> Result<RunSummary> {
        let input_rows = events.len();
        let report = deliver_all(Arc::clone(&self.client), events, self.settings.concurrency).await;
        let output_path = self.write_failures(&report.failed).await?;

        Ok(RunSummary {
            input_rows,
            processed_rows: report.delivered_count(),
            failed_rows: report.failed.len(),
            output_path,
        })
    }
}
