use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::mapping::LEAD_SOURCE;
use crate::domain::model::{Assignments, LeadRecord};

const LEAD_STATUS: &str = "unworked";
const NOTE_CATEGORY: &str = "info";

/// POST /leads 的內容
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LeadEvent {
    pub id: Option<String>,
    pub registered_date: String,
    pub info: LeadInfo,
    pub assigned_agents: AssignedAgents,
    pub notes: Vec<LeadNote>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LeadInfo {
    pub status: String,
    pub source: String,
    pub contact: Contact,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Contact {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_validated_email: Option<bool>,
    pub phone_numbers: PhoneNumbers,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mailing_address: Option<MailingAddress>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PhoneNumbers {
    pub cell_phone: Option<String>,
    pub home_phone: Option<String>,
    pub work_phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MailingAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_or_zip: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AssignedAgents {
    pub primary_agent: AgentRef,
    pub listing_agent: AgentRef,
    pub partner: AgentRef,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AgentRef {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LeadNote {
    pub content: String,
    pub category: String,
    pub created_by: String,
    pub created_date: String,
}

fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

impl LeadEvent {
    pub fn from_lead(lead: &LeadRecord, assignments: &Assignments, now: DateTime<Utc>) -> Self {
        let created = timestamp(now);

        // 地址四個欄位齊全才送出
        let mailing_address = match (&lead.address, &lead.city, &lead.state, &lead.zip_code) {
            (Some(street), Some(city), Some(state), Some(zip)) => Some(MailingAddress {
                street: street.clone(),
                city: city.clone(),
                state: state.clone(),
                postal_or_zip: zip.clone(),
            }),
            _ => None,
        };

        let contact = Contact {
            first_name: lead.first_name.clone(),
            last_name: lead.last_name.clone(),
            email: lead.email_1.clone(),
            is_validated_email: lead.email_1.as_ref().map(|_| true),
            phone_numbers: PhoneNumbers {
                cell_phone: lead.phone_1.clone(),
                home_phone: lead.phone_2.clone(),
                work_phone: lead.phone_3.clone(),
            },
            mailing_address,
        };

        let notes = lead
            .insight
            .iter()
            .map(|insight| LeadNote {
                content: insight.clone(),
                category: NOTE_CATEGORY.to_string(),
                created_by: LEAD_SOURCE.to_string(),
                created_date: created.clone(),
            })
            .collect();

        Self {
            id: lead.md5.clone(),
            registered_date: created,
            info: LeadInfo {
                status: LEAD_STATUS.to_string(),
                source: LEAD_SOURCE.to_string(),
                contact,
            },
            assigned_agents: AssignedAgents {
                primary_agent: AgentRef {
                    id: assignments.agent_assigned.clone(),
                },
                listing_agent: AgentRef {
                    id: assignments.listing_agent.clone(),
                },
                partner: AgentRef {
                    id: assignments.partner.clone(),
                },
            },
            notes,
        }
    }
}
