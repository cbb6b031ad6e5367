pub mod account;
pub mod animal;
pub mod task;
