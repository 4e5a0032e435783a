//! Port traits: the collaborators the domain core consumes.

pub mod config_port;
pub mod history_port;
pub mod order_port;
