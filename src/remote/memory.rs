use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use super::error::ServiceError;
use super::query::Query;
use super::record::{encode_date, Record, CREATE_DATE, UPDATE_DATE};
use super::session::Session;
use super::RemoteDataService;

struct User {
    id: String,
    password: String,
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    classes: HashMap<String, Vec<Record>>,
    session: Option<Session>,
}

/// Backend kept entirely in process memory.
///
/// Queries, limits and ACLs behave like the hosted service; nothing
/// survives the process.
#[derive(Default)]
pub struct MemoryService {
    inner: Mutex<Inner>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn new_id() -> String {
        Uuid::new_v4().simple().to_string()
    }
}

impl Inner {
    fn user_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.user_id.as_str())
    }
}

#[async_trait]
impl RemoteDataService for MemoryService {
    async fn query(&self, query: &Query) -> Result<Vec<Record>, ServiceError> {
        let inner = self.inner();
        let user = inner.user_id();
        let results: Vec<Record> = inner
            .classes
            .get(&query.class_name)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.acl.can_read(user) && query.matches(r))
                    .take(query.limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        debug!(class = %query.class_name, count = results.len(), "memory query");
        Ok(results)
    }

    async fn save(&self, class_name: &str, mut record: Record) -> Result<Record, ServiceError> {
        let mut inner = self.inner();
        let user = inner.user_id().map(str::to_string);
        let now = encode_date(Utc::now());
        let records = inner.classes.entry(class_name.to_string()).or_default();

        match record.object_id.clone() {
            None => {
                record.object_id = Some(Self::new_id());
                record.fields.insert(CREATE_DATE.to_string(), now);
                records.push(record.clone());
            }
            Some(id) => {
                let existing = records
                    .iter_mut()
                    .find(|r| r.object_id.as_deref() == Some(id.as_str()))
                    .ok_or_else(|| ServiceError::NotFound(format!("{class_name}/{id}")))?;
                if !existing.acl.can_write(user.as_deref()) {
                    return Err(ServiceError::Auth(format!("no write access to {class_name}/{id}")));
                }
                record.fields.insert(UPDATE_DATE.to_string(), now);
                *existing = record.clone();
            }
        }
        Ok(record)
    }

    async fn delete(&self, class_name: &str, object_id: &str) -> Result<String, ServiceError> {
        let mut inner = self.inner();
        let user = inner.user_id().map(str::to_string);
        let not_found = || ServiceError::NotFound(format!("{class_name}/{object_id}"));
        let records = inner.classes.get_mut(class_name).ok_or_else(not_found)?;
        let index = records
            .iter()
            .position(|r| r.object_id.as_deref() == Some(object_id))
            .ok_or_else(not_found)?;
        if !records[index].acl.can_write(user.as_deref()) {
            return Err(ServiceError::Auth(format!(
                "no write access to {class_name}/{object_id}"
            )));
        }
        records.remove(index);
        Ok(object_id.to_string())
    }

    async fn sign_up(&self, user_name: &str, password: &str) -> Result<(), ServiceError> {
        let mut inner = self.inner();
        if inner.users.contains_key(user_name) {
            return Err(ServiceError::Conflict(format!("user {user_name} already exists")));
        }
        inner.users.insert(
            user_name.to_string(),
            User {
                id: Self::new_id(),
                password: password.to_string(),
            },
        );
        Ok(())
    }

    async fn log_in(&self, user_name: &str, password: &str) -> Result<Session, ServiceError> {
        let mut inner = self.inner();
        let user = inner
            .users
            .get(user_name)
            .filter(|u| u.password == password)
            .ok_or_else(|| ServiceError::Auth("invalid user name or password".to_string()))?;
        let session = Session {
            user_id: user.id.clone(),
            user_name: user_name.to_string(),
            token: Self::new_id(),
        };
        inner.session = Some(session.clone());
        Ok(session)
    }

    async fn log_out(&self) -> Result<(), ServiceError> {
        self.inner().session = None;
        Ok(())
    }

    fn current_session(&self) -> Option<Session> {
        self.inner().session.clone()
    }
}
