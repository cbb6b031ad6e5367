pub mod account_mapper;
pub mod animal_mapper;
pub mod task_mapper;

pub use account_mapper::AccountMapper;
pub use animal_mapper::AnimalMapper;
pub use task_mapper::TaskMapper;
