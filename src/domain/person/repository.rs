use super::{filter::PersonFilter, person::Person};
use uuid::Uuid;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum PersonRepositoryError {
    #[error("person not found")]
    PersonNotFound,
    #[error("person already exists")]
    PersonAlreadyExists,
    /// The write was rejected by the optimistic concurrency check.
    #[error("concurrent modification: {0}")]
    ConcurrencyConflict(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

#[async_trait::async_trait]
pub trait PersonRepository: PersonClone + Send + Sync {
    async fn create_person(&self, person: &Person) -> Result<(), PersonRepositoryError>;
    /// Replaces the stored record with the same id. Fails with
    /// `ConcurrencyConflict` when nothing was written.
    async fn update_person(&self, person: &Person) -> Result<(), PersonRepositoryError>;
    async fn get_person_by_id(&self, id: &Uuid) -> Result<Person, PersonRepositoryError>;
    async fn get_people(&self, filter: &PersonFilter) -> Result<Vec<Person>, PersonRepositoryError>;
    async fn delete_person(&self, id: &Uuid) -> Result<(), PersonRepositoryError>;
}
pub trait PersonClone {
    fn clone_box(&self) -> Box<dyn PersonRepository>;
}

impl<T> PersonClone for T
where
    T: 'static + PersonRepository + Clone,
{
    fn clone_box(&self) -> Box<dyn PersonRepository> {
        Box::new(self.clone())
    }
}

// We can now implement Clone manually by forwarding to clone_box.
impl Clone for Box<dyn PersonRepository> {
    fn clone(&self) -> Box<dyn PersonRepository> {
        self.clone_box()
    }
}

#[cfg(test)]
use async_trait::async_trait;

#[cfg(test)]
mockall::mock! {
    pub PersonStore {}

    #[async_trait]
    impl PersonRepository for PersonStore {
        async fn create_person(&self, person: &Person) -> Result<(), PersonRepositoryError>;
        async fn update_person(&self, person: &Person) -> Result<(), PersonRepositoryError>;
        async fn get_person_by_id(&self, id: &Uuid) -> Result<Person, PersonRepositoryError>;
        async fn get_people(&self, filter: &PersonFilter) -> Result<Vec<Person>, PersonRepositoryError>;
        async fn delete_person(&self, id: &Uuid) -> Result<(), PersonRepositoryError>;
    }

    impl Clone for PersonStore {
        fn clone(&self) -> Self;
    }
}
