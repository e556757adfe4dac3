pub mod metrics;
pub mod orchestrator;
pub mod session_lock;
