pub mod memory_repository;
