use super::payload::PatientPayload;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: u32,
    pub call_id: u32,
    #[serde(default)]
    pub name: String,
    pub age: Option<u32>,
}

impl Patient {
    pub fn new(id: u32, call_id: u32, payload: PatientPayload) -> Self {
        Self {
            id,
            call_id,
            name: payload.name.trim().to_string(),
            age: payload.age,
        }
    }
}
