mod filter;
mod manager;
mod person;
mod repository;

pub use filter::PersonFilter;
pub use manager::PersonManager;
pub use person::Person;
pub use repository::{PersonRepository, PersonRepositoryError};

#[cfg(test)]
pub use repository::MockPersonStore;
