pub mod auth;
pub mod legal;
pub mod scans;
pub mod user;
