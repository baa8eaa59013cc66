use super::{
    filter::PersonFilter,
    person::Person,
    repository::{PersonRepository, PersonRepositoryError},
};
use uuid::Uuid;

#[derive(Clone)]
pub struct PersonManager {
    repository: Box<dyn PersonRepository>,
}

impl PersonManager {
    pub fn new(repository: Box<dyn PersonRepository>) -> Self {
        return PersonManager { repository };
    }

    pub async fn create_person(&self, person: Person) -> Result<Person, PersonRepositoryError> {
        self.repository.create_person(&person).await?;
        Ok(person)
    }

    /// Writes the full record. A conflict on a record that has since been
    /// deleted is reported as `PersonNotFound`; any other conflict is
    /// returned as is.
    pub async fn update_person(&self, person: Person) -> Result<(), PersonRepositoryError> {
        match self.repository.update_person(&person).await {
            Err(PersonRepositoryError::ConcurrencyConflict(reason)) => {
                match self.repository.get_person_by_id(person.id()).await {
                    Ok(_) => Err(PersonRepositoryError::ConcurrencyConflict(reason)),
                    Err(e) => Err(e),
                }
            }
            other => other,
        }
    }

    pub async fn get_person_by_id(&self, id: &Uuid) -> Result<Person, PersonRepositoryError> {
        self.repository.get_person_by_id(id).await
    }

    pub async fn get_people(
        &self,
        filter: &PersonFilter,
    ) -> Result<Vec<Person>, PersonRepositoryError> {
        self.repository.get_people(filter).await
    }

    pub async fn delete_person(&self, id: &Uuid) -> Result<(), PersonRepositoryError> {
        self.repository.delete_person(id).await
    }
}
