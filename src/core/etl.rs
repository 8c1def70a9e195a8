use crate::core::{Pipeline, RunSummary};
use crate::utils::error::Result;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        tracing::info!("Extracting leads...");
        let batch = self.pipeline.extract().await?;
        tracing::info!("Extracted {} leads", batch.len());

        if batch.is_empty() {
            tracing::warn!("Input file contains no leads");
        }

        tracing::info!("Transforming leads...");
        let output = self.pipeline.transform(batch).await?;

        tracing::info!("Loading leads...");
        let summary = self.pipeline.load(output).await?;
        tracing::info!(
            "Processed {}/{} leads ({} failed)",
            summary.processed_rows,
            summary.input_rows,
            summary.failed_rows
        );

        Ok(summary)
    }
}
