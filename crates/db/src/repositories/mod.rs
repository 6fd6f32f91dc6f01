pub mod file_catalog_repo;
pub mod file_decision_repo;
pub mod media_file_repo;
pub mod migration_log_repo;
pub mod migration_run_repo;

pub use file_catalog_repo::FileCatalogRepo;
pub use file_decision_repo::FileDecisionRepo;
pub use media_file_repo::MediaFileRepo;
pub use migration_log_repo::MigrationLogRepo;
pub use migration_run_repo::MigrationRunRepo;
