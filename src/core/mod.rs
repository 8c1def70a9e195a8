pub mod deliver;
pub mod etl;
pub mod mapping;
pub mod pipeline;
pub mod reader;

pub use crate::domain::model::{LeadBatch, LeadRecord, RunSummary};
pub use crate::domain::ports::{Pipeline, Storage};
pub use crate::utils::error::Result;
