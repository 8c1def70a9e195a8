use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::adapters::cinc::{CincClient, LeadEvent};
use crate::domain::model::{DeliveryOutcome, DeliveryReport, FailedLead};
use crate::utils::error::{EtlError, Result};

/// 逐筆送出 lead，最多 concurrency 筆同時進行
///
/// 單筆失敗只會記錄在報告中，不會中斷其他 lead。
pub async fn deliver_all(
    client: Arc<CincClient>,
    events: Vec<LeadEvent>,
    concurrency: usize,
) -> DeliveryReport {
    let total = events.len();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (index, event) in events.into_iter().enumerate() {
        let client = Arc::clone(&client);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let result = client.create_lead(&event).await;
            (index, event.id, result)
        });
    }

    let mut slots: Vec<Option<(Option<String>, DeliveryOutcome)>> = vec![None; total];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, md5, Ok(response))) => {
                tracing::info!(
                    "Delivered lead {}, response_status: {}",
                    md5.as_deref().unwrap_or("<no md5>"),
                    response
                        .get("status")
                        .and_then(|s| s.as_str())
                        .unwrap_or("unknown")
                );
                slots[index] = Some((md5, DeliveryOutcome::Delivered(response)));
            }
            Ok((index, md5, Err(e))) => {
                tracing::warn!(
                    "Failed to deliver lead {}: {}",
                    md5.as_deref().unwrap_or("<no md5>"),
                    e
                );
                slots[index] = Some((
                    md5,
                    DeliveryOutcome::Failed {
                        error: e.to_string(),
                    },
                ));
            }
            Err(e) => tracing::error!("Delivery task aborted: {}", e),
        }
    }

    let mut report = DeliveryReport::default();
    for slot in slots {
        let (md5, outcome) = slot.unwrap_or((
            None,
            DeliveryOutcome::Failed {
                error: "delivery task aborted".to_string(),
            },
        ));
        if let DeliveryOutcome::Failed { error } = &outcome {
            report.failed.push(FailedLead {
                md5,
                error: error.clone(),
            });
        }
        report.outcomes.push(outcome);
    }
    report
}

/// 失敗清單輸出成 md5,error 的 CSV
pub fn write_failures_csv(failed: &[FailedLead]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for lead in failed {
        writer.serialize(lead)?;
    }
    if failed.is_empty() {
        writer.write_record(["md5", "error"])?;
    }
    writer
        .into_inner()
        .map_err(|e| EtlError::processing(format!("Failed to flush failure report: {}", e.error())))
}
