use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::person::{Person, PersonFilter, PersonRepository, PersonRepositoryError};

/// Process-local store. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPersonRepository {
    people: Arc<RwLock<HashMap<Uuid, Person>>>,
}

impl InMemoryPersonRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PersonRepository for InMemoryPersonRepository {
    async fn create_person(&self, person: &Person) -> Result<(), PersonRepositoryError> {
        let mut people = self.people.write().await;
        if people.contains_key(person.id()) {
            return Err(PersonRepositoryError::PersonAlreadyExists);
        }
        people.insert(*person.id(), person.clone());
        Ok(())
    }

    async fn update_person(&self, person: &Person) -> Result<(), PersonRepositoryError> {
        let mut people = self.people.write().await;
        match people.get_mut(person.id()) {
            Some(stored) => {
                *stored = person.clone();
                Ok(())
            }
            None => Err(PersonRepositoryError::ConcurrencyConflict(format!(
                "Expected to update person {}, it is no longer stored",
                person.id()
            ))),
        }
    }

    async fn get_person_by_id(&self, id: &Uuid) -> Result<Person, PersonRepositoryError> {
        self.people
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(PersonRepositoryError::PersonNotFound)
    }

    async fn get_people(&self, filter: &PersonFilter) -> Result<Vec<Person>, PersonRepositoryError> {
        Ok(self
            .people
            .read()
            .await
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn delete_person(&self, id: &Uuid) -> Result<(), PersonRepositoryError> {
        match self.people.write().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(PersonRepositoryError::PersonNotFound),
        }
    }
}
