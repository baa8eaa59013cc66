use super::person::Person;

/// Name filter applied when listing people.
///
/// Each field, when set, matches a name that starts or ends with it, ignoring
/// case. Fields are combined with AND; an unset or empty field matches
/// everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonFilter {
    first_name: Option<String>,
    last_name: Option<String>,
}

impl PersonFilter {
    pub fn new(first_name: Option<&str>, last_name: Option<&str>) -> Self {
        Self {
            first_name: normalize(first_name),
            last_name: normalize(last_name),
        }
    }

    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }
    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    pub fn matches(&self, person: &Person) -> bool {
        field_matches(person.first_name(), self.first_name())
            && field_matches(person.last_name(), self.last_name())
    }
}

// Filters are kept lower-cased so stores only need to lower the column side.
fn normalize(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.is_empty())
        .map(|v| v.to_lowercase())
}

fn field_matches(value: &str, filter: Option<&str>) -> bool {
    match filter {
        Some(filter) => {
            let value = value.to_lowercase();
            value.starts_with(filter) || value.ends_with(filter)
        }
        None => true,
    }
}
