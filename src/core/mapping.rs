use crate::domain::model::{Assignments, CincTable, LeadBatch, LeadRecord};
use crate::utils::error::{EtlError, Result};

/// Real Intent 欄位 -> CINC 欄位，順序即輸出順序
pub const COLUMN_MAPPINGS: [(&str, &str); 11] = [
    ("first_name", "First Name"),
    ("last_name", "Last Name"),
    ("email_1", "Email"),
    ("email_2", "CC Email"),
    ("phone_1", "Cell Phone"),
    ("phone_2", "Home Phone"),
    ("phone_3", "Work Phone"),
    ("address", "Street Address"),
    ("city", "City"),
    ("state", "State"),
    ("zip_code", "Zip/Postal Code"),
];

pub const LEAD_SOURCE: &str = "Real Intent";

const YES: &str = "YES";

fn flag(value: bool) -> String {
    let text = if value { YES } else { "" };
    text.to_string()
}

/// 每筆 lead 都會產生剛好一列 CINC 資料
pub fn convert(batch: &LeadBatch, assignments: &Assignments) -> CincTable {
    let include_note = batch.has_column("insight");

    // 只加入有值的指派欄位
    let fixed: Vec<(&str, &str)> = [
        ("Agent Assigned", assignments.agent_assigned.as_deref()),
        ("Listing Agent", assignments.listing_agent.as_deref()),
        ("Partner", assignments.partner.as_deref()),
        ("Pipeline", assignments.pipeline.as_deref()),
    ]
    .into_iter()
    .filter_map(|(column, value)| {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| (column, v))
    })
    .collect();

    let mut headers: Vec<String> = COLUMN_MAPPINGS
        .iter()
        .map(|(_, target)| target.to_string())
        .collect();
    headers.push("Valid Email".to_string());
    headers.push("Valid Cell Phone".to_string());
    if include_note {
        headers.push("Custom Note".to_string());
    }
    headers.extend(fixed.iter().map(|(column, _)| column.to_string()));
    headers.push("Source".to_string());

    let rows = batch
        .leads
        .iter()
        .map(|lead| convert_row(lead, include_note, &fixed))
        .collect();

    CincTable { headers, rows }
}

fn convert_row(lead: &LeadRecord, include_note: bool, fixed: &[(&str, &str)]) -> Vec<String> {
    let mut row: Vec<String> = COLUMN_MAPPINGS
        .iter()
        .map(|(source, _)| lead.field(source).unwrap_or_default().to_string())
        .collect();

    row.push(flag(lead.email_1.is_some()));
    row.push(flag(lead.has_phone()));

    if include_note {
        row.push(
            lead.insight
                .as_deref()
                .map(|insight| format!("Insight: {}", insight))
                .unwrap_or_default(),
        );
    }

    row.extend(fixed.iter().map(|(_, value)| value.to_string()));
    row.push(LEAD_SOURCE.to_string());
    row
}

pub fn write_csv(table: &CincTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| EtlError::processing(format!("Failed to flush CSV output: {}", e.error())))
}
