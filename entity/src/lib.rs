pub mod automation_error;
pub mod automation_run;
pub mod refresh_token;
pub mod scan_history;
pub mod user;
