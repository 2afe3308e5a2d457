pub mod once;
pub mod serve;
