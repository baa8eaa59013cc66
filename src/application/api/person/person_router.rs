use std::{collections::HashMap, str::FromStr};

use hyper::Method;
use serde::{Deserialize, Serialize};
use serde_json::{value, Value};
use uuid::Uuid;

use crate::{
    application::api::router::{
        ApiResponse, HttpError, INTERNAL_ERROR, NOT_FOUND_ERROR, PERSONS_BASE_PATH,
    },
    domain::person::{Person, PersonFilter, PersonManager, PersonRepositoryError},
};

const INVALID_NAME_ERROR: HttpError<'static> = HttpError::new(
    400,
    "InvalidName",
    "FirstName and LastName cannot be empty.",
);

const INVALID_FORMAT_ERROR: HttpError<'static> = HttpError::new(
    400,
    "InvalidFormat",
    "The body format is invalid. Please refer to the documentation",
);

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePersonInput {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

impl TryFrom<CreatePersonInput> for Person {
    type Error = HttpError<'static>;

    fn try_from(value: CreatePersonInput) -> Result<Self, Self::Error> {
        // Any id sent by the client is dropped here.
        let person = Person::new(Uuid::new_v4(), &value.first_name, &value.last_name);
        if !person.has_complete_name() {
            return Err(INVALID_NAME_ERROR);
        }
        Ok(person)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePersonInput {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

impl UpdatePersonInput {
    fn into_person(self, path_id: &Uuid) -> Result<Person, HttpError<'static>> {
        let body_id = self.id.as_deref().and_then(|id| Uuid::from_str(id).ok());
        if body_id.as_ref() != Some(path_id) {
            return Err(HttpError::new(
                400,
                "IdMismatch",
                "The id in the body must match the id in the path",
            ));
        }
        let person = Person::new(*path_id, &self.first_name, &self.last_name);
        if !person.has_complete_name() {
            return Err(INVALID_NAME_ERROR);
        }
        Ok(person)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GetPersonOutput {
    id: String,
    first_name: String,
    last_name: String,
}

impl From<Person> for GetPersonOutput {
    fn from(value: Person) -> Self {
        return Self {
            id: value.id().to_string(),
            first_name: value.first_name().clone(),
            last_name: value.last_name().clone(),
        };
    }
}

impl From<PersonRepositoryError> for HttpError<'static> {
    fn from(value: PersonRepositoryError) -> Self {
        match value {
            PersonRepositoryError::PersonNotFound => {
                HttpError::new(404, "PersonNotFound", "The person requested is not found")
            }
            PersonRepositoryError::PersonAlreadyExists => HttpError::new(
                409,
                "PersonAlreadyExists",
                "The person you try to create already exists.",
            ),
            PersonRepositoryError::ConcurrencyConflict(e) => {
                log::error!("Unresolved concurrent modification of a person: {}", e);
                HttpError::new(
                    500,
                    "ConcurrencyConflict",
                    "The person was modified concurrently, the update was not applied",
                )
            }
            PersonRepositoryError::InternalError(e) => {
                log::error!(
                    "An internal error occured while making an action on Persons: {}",
                    e
                );
                INTERNAL_ERROR
            }
        }
    }
}

fn to_json<T: Serialize>(output: T) -> Result<Value, HttpError<'static>> {
    value::to_value(output).map_err(|e| {
        log::error!(
            "An internal error occured while converting persons to value: {:?}",
            e
        );
        INTERNAL_ERROR
    })
}

fn parse_id(raw: &str) -> Result<Uuid, HttpError<'static>> {
    Uuid::from_str(raw).map_err(|_| {
        HttpError::new(
            400,
            "InvalidUID",
            "The UID you provided seems not to be a valid UUID",
        )
    })
}

pub async fn router(
    path: &str,
    query_params: &HashMap<String, String>,
    method: &Method,
    body: Value,
    person_manager: &PersonManager,
) -> Result<ApiResponse, HttpError<'static>> {
    if path.contains('/') {
        return Err(NOT_FOUND_ERROR);
    }
    match (method, path) {
        (&Method::POST, "") => {
            let create_person_input: CreatePersonInput =
                serde_json::from_value(body).map_err(|_| INVALID_FORMAT_ERROR)?;
            let created = person_manager
                .create_person(create_person_input.try_into()?)
                .await?;
            let location = format!("{}/{}", PERSONS_BASE_PATH, created.id());
            Ok(ApiResponse::created(
                to_json(GetPersonOutput::from(created))?,
                location,
            ))
        }
        (&Method::GET, "") => {
            // Get all people matching the optional name filters
            let filter = PersonFilter::new(
                query_params.get("firstName").map(|s| s.as_str()),
                query_params.get("lastName").map(|s| s.as_str()),
            );
            let people = person_manager.get_people(&filter).await?;
            let people_json: Vec<GetPersonOutput> =
                people.into_iter().map(GetPersonOutput::from).collect();
            Ok(ApiResponse::ok(to_json(people_json)?))
        }
        (&Method::GET, _) => {
            let id = parse_id(path)?;
            let person_found: GetPersonOutput =
                person_manager.get_person_by_id(&id).await?.into();
            Ok(ApiResponse::ok(to_json(person_found)?))
        }
        (&Method::PUT, id) if !id.is_empty() => {
            let id = parse_id(id)?;
            let update_person_input: UpdatePersonInput =
                serde_json::from_value(body).map_err(|_| INVALID_FORMAT_ERROR)?;
            person_manager
                .update_person(update_person_input.into_person(&id)?)
                .await?;
            Ok(ApiResponse::no_content())
        }
        (&Method::DELETE, id) if !id.is_empty() => {
            let id = parse_id(id)?;
            person_manager.delete_person(&id).await?;
            Ok(ApiResponse::no_content())
        }
        (_, _) => return Err(NOT_FOUND_ERROR),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use hyper::Method;
    use serde_json::{json, Value};
    use uuid::Uuid;

    use super::router;
    use crate::{
        application::api::router::ApiResponse,
        domain::person::{
            MockPersonStore, Person, PersonFilter, PersonManager, PersonRepositoryError,
        },
        infrastructure::person::memory::memory_repository::InMemoryPersonRepository,
    };

    fn manager() -> PersonManager {
        PersonManager::new(Box::new(InMemoryPersonRepository::new()))
    }

    async fn create(manager: &PersonManager, body: Value) -> ApiResponse {
        router("", &HashMap::new(), &Method::POST, body, manager)
            .await
            .unwrap()
    }

    fn id_of(response: &ApiResponse) -> String {
        response.body().unwrap()["id"].as_str().unwrap().to_owned()
    }

    async fn stored_count(manager: &PersonManager) -> usize {
        manager
            .get_people(&PersonFilter::default())
            .await
            .unwrap()
            .len()
    }

    #[tokio::test]
    async fn test_create_rejects_empty_names() {
        let manager = manager();
        for body in [
            json!({"firstName": "", "lastName": "Lee"}),
            json!({"firstName": "Ann", "lastName": ""}),
            json!({"firstName": "Ann"}),
            json!({}),
        ] {
            let res = router("", &HashMap::new(), &Method::POST, body, &manager).await;
            assert_eq!(res.unwrap_err().code(), 400);
        }
        assert_eq!(stored_count(&manager).await, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_unreadable_body() {
        let manager = manager();
        let res = router("", &HashMap::new(), &Method::POST, Value::Null, &manager).await;
        assert_eq!(res.unwrap_err().error(), "InvalidFormat");
    }

    #[tokio::test]
    async fn test_create_ignores_client_id() {
        let manager = manager();
        let client_id = Uuid::new_v4().to_string();
        let created = create(
            &manager,
            json!({"id": client_id, "firstName": "Ann", "lastName": "Lee"}),
        )
        .await;
        let id = id_of(&created);
        assert_ne!(id, client_id);
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[tokio::test]
    async fn test_get_after_create_returns_same_record() {
        let manager = manager();
        let created = create(&manager, json!({"firstName": "Ann", "lastName": "Lee"})).await;
        let id = id_of(&created);
        let fetched = router(&id, &HashMap::new(), &Method::GET, Value::Null, &manager)
            .await
            .unwrap();
        assert_eq!(fetched.body(), created.body());
        assert_eq!(
            fetched.body(),
            Some(&json!({"id": id, "firstName": "Ann", "lastName": "Lee"}))
        );
    }

    #[tokio::test]
    async fn test_get_with_malformed_or_unknown_id() {
        let manager = manager();
        let res = router("not-a-uuid", &HashMap::new(), &Method::GET, Value::Null, &manager).await;
        assert_eq!(res.unwrap_err().code(), 400);
        let unknown = Uuid::new_v4().to_string();
        let res = router(&unknown, &HashMap::new(), &Method::GET, Value::Null, &manager).await;
        assert_eq!(res.unwrap_err().code(), 404);
    }

    #[tokio::test]
    async fn test_update_replaces_record() {
        let manager = manager();
        let created = create(&manager, json!({"firstName": "Ann", "lastName": "Lee"})).await;
        let id = id_of(&created);
        let updated = router(
            &id,
            &HashMap::new(),
            &Method::PUT,
            json!({"id": id, "firstName": "Anna", "lastName": "Leigh"}),
            &manager,
        )
        .await
        .unwrap();
        assert_eq!(updated.status(), 204);
        let fetched = router(&id, &HashMap::new(), &Method::GET, Value::Null, &manager)
            .await
            .unwrap();
        assert_eq!(
            fetched.body(),
            Some(&json!({"id": id, "firstName": "Anna", "lastName": "Leigh"}))
        );
    }

    #[tokio::test]
    async fn test_update_with_mismatched_id_leaves_store_unchanged() {
        let manager = manager();
        let created = create(&manager, json!({"firstName": "Ann", "lastName": "Lee"})).await;
        let id = id_of(&created);
        for body in [
            json!({"id": Uuid::new_v4().to_string(), "firstName": "Bob", "lastName": "Ray"}),
            json!({"firstName": "Bob", "lastName": "Ray"}),
            json!({"id": "garbage", "firstName": "Bob", "lastName": "Ray"}),
        ] {
            let res = router(&id, &HashMap::new(), &Method::PUT, body, &manager).await;
            let err = res.unwrap_err();
            assert_eq!(err.code(), 400);
            assert_eq!(err.error(), "IdMismatch");
        }
        let fetched = router(&id, &HashMap::new(), &Method::GET, Value::Null, &manager)
            .await
            .unwrap();
        assert_eq!(fetched.body(), created.body());
    }

    #[tokio::test]
    async fn test_update_of_missing_person_is_not_found() {
        let manager = manager();
        let id = Uuid::new_v4().to_string();
        let res = router(
            &id,
            &HashMap::new(),
            &Method::PUT,
            json!({"id": id, "firstName": "Ann", "lastName": "Lee"}),
            &manager,
        )
        .await;
        assert_eq!(res.unwrap_err().code(), 404);
        assert_eq!(stored_count(&manager).await, 0);
    }

    #[tokio::test]
    async fn test_update_conflict_on_existing_person_is_server_error() {
        let mut store = MockPersonStore::new();
        store
            .expect_update_person()
            .returning(|_| Err(PersonRepositoryError::ConcurrencyConflict("stale".to_owned())));
        store
            .expect_get_person_by_id()
            .returning(|id| Ok(Person::new(*id, "Ann", "Lee")));
        let manager = PersonManager::new(Box::new(store));
        let id = Uuid::new_v4().to_string();
        let res = router(
            &id,
            &HashMap::new(),
            &Method::PUT,
            json!({"id": id, "firstName": "Ann", "lastName": "Lee"}),
            &manager,
        )
        .await;
        let err = res.unwrap_err();
        assert_eq!(err.code(), 500);
        assert_eq!(err.error(), "ConcurrencyConflict");
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let manager = manager();
        let created = create(&manager, json!({"firstName": "Ann", "lastName": "Lee"})).await;
        let id = id_of(&created);
        let deleted = router(&id, &HashMap::new(), &Method::DELETE, Value::Null, &manager)
            .await
            .unwrap();
        assert_eq!(deleted, ApiResponse::no_content());
        let res = router(&id, &HashMap::new(), &Method::GET, Value::Null, &manager).await;
        assert_eq!(res.unwrap_err().code(), 404);
        let res = router(&id, &HashMap::new(), &Method::DELETE, Value::Null, &manager).await;
        assert_eq!(res.unwrap_err().code(), 404);
    }

    #[tokio::test]
    async fn test_list_matches_prefix_or_suffix() {
        let manager = manager();
        create(&manager, json!({"firstName": "Jane", "lastName": "Doe"})).await;
        for filter in ["Jan", "ane", "JANE"] {
            let params = HashMap::from([("firstName".to_owned(), filter.to_owned())]);
            let listed = router("", &params, &Method::GET, Value::Null, &manager)
                .await
                .unwrap();
            assert_eq!(listed.body().unwrap().as_array().unwrap().len(), 1);
        }
        let params = HashMap::from([("firstName".to_owned(), "an".to_owned())]);
        let listed = router("", &params, &Method::GET, Value::Null, &manager)
            .await
            .unwrap();
        assert_eq!(listed.body(), Some(&json!([])));
    }

    #[tokio::test]
    async fn test_unsupported_routes_are_not_found() {
        let manager = manager();
        let id = Uuid::new_v4().to_string();
        let nested = format!("{}/speeches", id);
        let cases = [
            (Method::PUT, ""),
            (Method::DELETE, ""),
            (Method::PATCH, id.as_str()),
            (Method::GET, nested.as_str()),
        ];
        for (method, path) in cases {
            let res = router(path, &HashMap::new(), &method, Value::Null, &manager).await;
            assert_eq!(res.unwrap_err().code(), 404);
        }
    }
}
