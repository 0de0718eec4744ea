pub mod impact;
pub mod layout;
pub mod lifecycle;
pub mod lighting;
pub mod orchestrator;
pub mod quality;
