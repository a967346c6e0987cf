pub mod capture_queue;
pub mod frame_audit_log;
pub mod recorder;
