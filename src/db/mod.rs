pub mod migration;
pub mod pool;
pub mod queries;
