use std::collections::HashMap;

use crate::core::mapping::COLUMN_MAPPINGS;
use crate::domain::model::{LeadBatch, LeadRecord};
use crate::utils::error::{EtlError, Result};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// 解析 Real Intent CSV
///
/// 必要欄位缺少時會一次列出全部缺少的欄位；多餘欄位會被忽略。
/// 欄位數不足的列視為尾端欄位空白。
pub fn parse_leads(data: &[u8]) -> Result<LeadBatch> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(data);

    let original: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let headers = dedup_headers(&original);

    let missing: Vec<String> = COLUMN_MAPPINGS
        .iter()
        .map(|(source, _)| *source)
        .filter(|source| !headers.iter().any(|h| h == source))
        .map(str::to_string)
        .collect();

    if !missing.is_empty() {
        return Err(EtlError::MissingColumnsError { columns: missing });
    }

    let header_record = csv::StringRecord::from(headers.clone());
    let mut leads = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let mut record = row?;
        // 補齊尾端缺少的欄位
        while record.len() < header_record.len() {
            record.push_field("");
        }
        let lead: LeadRecord = record.deserialize(Some(&header_record)).map_err(|e| {
            tracing::warn!("Row {} could not be parsed: {}", index + 2, e);
            e
        })?;
        leads.push(lead.normalized());
    }

    tracing::debug!("Parsed {} leads ({} columns)", leads.len(), headers.len());
    Ok(LeadBatch { headers, leads })
}

/// 重複的欄位名稱加上 .1、.2 後綴，只有第一個保留原名
fn dedup_headers(headers: &[String]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    headers
        .iter()
        .map(|header| {
            let count = seen.entry(header.as_str()).or_insert(0);
            let name = if *count == 0 {
                header.clone()
            } else {
                let renamed = format!("{}.{}", header, count);
                tracing::warn!("Duplicate column '{}' renamed to '{}'", header, renamed);
                renamed
            };
            *count += 1;
            name
        })
        .collect()
}
