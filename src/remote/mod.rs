//! Client side of the backend-as-a-service that owns users and records.
//!
//! Everything the app persists goes through [`RemoteDataService`]. The
//! HTTP implementation talks to an NCMB/Parse style REST API; the memory
//! implementation enforces the same predicates and access lists in
//! process.

pub mod acl;
pub mod error;
pub mod http;
pub mod memory;
pub mod query;
pub mod record;
pub mod session;

use async_trait::async_trait;

pub use acl::{Acl, Permission};
pub use error::ServiceError;
pub use http::HttpService;
pub use memory::MemoryService;
pub use query::{Comparison, Query};
pub use record::Record;
pub use session::{Session, SessionCache};

#[async_trait]
pub trait RemoteDataService: Send + Sync {
    /// Records of `query.class_name` matching every constraint, at most
    /// `query.limit` of them, in backend order.
    async fn query(&self, query: &Query) -> Result<Vec<Record>, ServiceError>;

    /// Inserts the record when it has no object id, updates it otherwise.
    async fn save(&self, class_name: &str, record: Record) -> Result<Record, ServiceError>;

    /// Removes a record and returns its object id.
    async fn delete(&self, class_name: &str, object_id: &str) -> Result<String, ServiceError>;

    async fn sign_up(&self, user_name: &str, password: &str) -> Result<(), ServiceError>;

    async fn log_in(&self, user_name: &str, password: &str) -> Result<Session, ServiceError>;

    async fn log_out(&self) -> Result<(), ServiceError>;

    fn current_session(&self) -> Option<Session>;
}
