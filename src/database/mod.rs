pub mod credentials;
pub mod manager;
pub mod records;
pub mod rows;

pub use credentials::PgCredentialStore;
pub use manager::{DatabaseError, DatabaseManager};
pub use records::PgRecordStore;
