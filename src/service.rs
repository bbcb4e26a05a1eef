// service.rs
pub mod background_jobs;
pub mod reconciliation;
pub mod referral;
pub mod repair;
pub mod session;
