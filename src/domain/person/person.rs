use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    id: Uuid,
    first_name: String,
    last_name: String,
}

impl Person {
    pub fn new(id: Uuid, first_name: &str, last_name: &str) -> Self {
        Self {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        }
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }
    pub fn first_name(&self) -> &String {
        &self.first_name
    }
    pub fn last_name(&self) -> &String {
        &self.last_name
    }

    /// Both names must be non-empty for a record to be persisted.
    pub fn has_complete_name(&self) -> bool {
        !self.first_name.is_empty() && !self.last_name.is_empty()
    }
}
