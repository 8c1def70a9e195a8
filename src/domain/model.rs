use serde::{Deserialize, Serialize};

/// Real Intent 匯出檔中的一筆 lead
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadRecord {
    #[serde(default)]
    pub md5: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_1: Option<String>,
    pub email_2: Option<String>,
    pub phone_1: Option<String>,
    pub phone_2: Option<String>,
    pub phone_3: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    #[serde(default)]
    pub insight: Option<String>,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl LeadRecord {
    /// 去除前後空白，空字串視為缺值
    pub fn normalized(self) -> Self {
        Self {
            md5: clean(self.md5),
            first_name: clean(self.first_name),
            last_name: clean(self.last_name),
            email_1: clean(self.email_1),
            email_2: clean(self.email_2),
            phone_1: clean(self.phone_1),
            phone_2: clean(self.phone_2),
            phone_3: clean(self.phone_3),
            address: clean(self.address),
            city: clean(self.city),
            state: clean(self.state),
            zip_code: clean(self.zip_code),
            insight: clean(self.insight),
        }
    }

    /// 依 Real Intent 欄位名稱取值
    pub fn field(&self, column: &str) -> Option<&str> {
        let value = match column {
            "md5" => &self.md5,
            "first_name" => &self.first_name,
            "last_name" => &self.last_name,
            "email_1" => &self.email_1,
            "email_2" => &self.email_2,
            "phone_1" => &self.phone_1,
            "phone_2" => &self.phone_2,
            "phone_3" => &self.phone_3,
            "address" => &self.address,
            "city" => &self.city,
            "state" => &self.state,
            "zip_code" => &self.zip_code,
            "insight" => &self.insight,
            _ => return None,
        };
        value.as_deref()
    }

    pub fn has_phone(&self) -> bool {
        self.phone_1.is_some() || self.phone_2.is_some() || self.phone_3.is_some()
    }

    /// 日誌與失敗報表用的識別字
    pub fn label(&self) -> String {
        self.md5.clone().unwrap_or_else(|| "<no md5>".to_string())
    }
}

/// 解析後的整份檔案
#[derive(Debug, Clone, Default)]
pub struct LeadBatch {
    pub headers: Vec<String>,
    pub leads: Vec<LeadRecord>,
}

impl LeadBatch {
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }
}

/// 使用者指定的指派資訊，空值會被忽略
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignments {
    pub agent_assigned: Option<String>,
    pub listing_agent: Option<String>,
    pub partner: Option<String>,
    pub pipeline: Option<String>,
}

impl Assignments {
    pub fn normalized(self) -> Self {
        Self {
            agent_assigned: clean(self.agent_assigned),
            listing_agent: clean(self.listing_agent),
            partner: clean(self.partner),
            pipeline: clean(self.pipeline),
        }
    }
}

/// CINC 匯入格式的表格
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CincTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CincTable {
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.headers.iter().position(|h| h == name)?;
        Some(self.rows.iter().map(|row| row[index].as_str()).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedLead {
    pub md5: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Delivered(serde_json::Value),
    Failed { error: String },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered(_))
    }
}

/// 上傳結果，outcomes 與輸入順序一致
#[derive(Debug, Clone, Default)]
pub struct DeliveryReport {
    pub outcomes: Vec<DeliveryOutcome>,
    pub failed: Vec<FailedLead>,
}

impl DeliveryReport {
    pub fn delivered_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_delivered()).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub input_rows: usize,
    pub processed_rows: usize,
    pub failed_rows: usize,
    pub output_path: Option<String>,
}
