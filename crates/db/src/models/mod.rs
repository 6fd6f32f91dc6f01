pub mod file_catalog_entry;
pub mod file_decision;
pub mod media_file;
pub mod migration_log_entry;
pub mod migration_run;
