use crate::domain::model::{LeadBatch, RunSummary};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    /// transform 階段的產出，交給 load 使用
    type Output: Send;

    async fn extract(&self) -> Result<LeadBatch>;
    async fn transform(&self, batch: LeadBatch) -> Result<Self::Output>;
    async fn load(&self, output: Self::Output) -> Result<RunSummary>;
}
