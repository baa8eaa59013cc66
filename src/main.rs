use application::{
    api::router::MainRouter,
    config::{Config, StoreConfig},
};
use domain::person::{PersonManager, PersonRepository, PersonRepositoryError};
use dotenv::dotenv;
use infrastructure::person::{
    memory::memory_repository::InMemoryPersonRepository,
    postgres::postgres_repository::PostgresPersonRepository,
};
use std::process::ExitCode;
use tokio::runtime::Runtime;

mod application;
mod domain;
mod infrastructure;

async fn build_repository(
    store: &StoreConfig,
) -> Result<Box<dyn PersonRepository>, PersonRepositoryError> {
    let repository: Box<dyn PersonRepository> = match store {
        StoreConfig::Memory => {
            log::warn!("Using the in-memory person store, data is lost on exit");
            Box::new(InMemoryPersonRepository::new())
        }
        StoreConfig::Postgres {
            url,
            timeout,
            max_connections,
        } => Box::new(PostgresPersonRepository::new(url, *timeout, *max_connections).await?),
    };
    Ok(repository)
}

fn main() -> ExitCode {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Check of env variables before starting the app.
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("Cannot start the tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };
    rt.block_on(async {
        let person_repository = match build_repository(config.store()).await {
            Ok(repository) => repository,
            Err(e) => {
                log::error!("Cannot connect to the DB: {}", e);
                return ExitCode::FAILURE;
            }
        };
        let person_manager = PersonManager::new(person_repository);
        let main_router = MainRouter::new(person_manager, *config.bind_address());
        match main_router.run().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                log::error!("An error occured: {:?}", e);
                ExitCode::FAILURE
            }
        }
    })
}
