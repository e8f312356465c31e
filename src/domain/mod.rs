//! Dispatch domain: entities, their state machines and the storage ports.

pub mod ambulance;
pub mod ambulance_call;
pub mod call;
pub mod location;
pub mod patient;
pub mod payload;
pub mod ports;
pub mod update;
