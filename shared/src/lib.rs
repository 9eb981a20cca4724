//! Types shared between the blob arena server and its clients.

pub mod config;
pub mod power_ups;
pub mod protocol;
pub mod skins;
