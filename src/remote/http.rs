use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::error::ServiceError;
use super::query::Query;
use super::record::{Record, CREATE_DATE, UPDATE_DATE};
use super::session::{Session, SessionCache};
use super::RemoteDataService;

pub const APPLICATION_KEY_HEADER: &str = "X-Application-Key";
pub const CLIENT_KEY_HEADER: &str = "X-Client-Key";
pub const SESSION_TOKEN_HEADER: &str = "X-Session-Token";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct Credentials {
    pub application_key: String,
    pub client_key: String,
}

/// REST client for the hosted backend.
pub struct HttpService {
    client: Client,
    base_url: String,
    credentials: Credentials,
    session: RwLock<Option<Session>>,
    cache: Option<SessionCache>,
}

#[derive(Deserialize)]
struct QueryResponse {
    results: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    object_id: String,
    create_date: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    update_date: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    object_id: String,
    user_name: String,
    session_token: String,
}

impl HttpService {
    /// Connects to `base_url` with the application's key pair. A session
    /// found in `cache` becomes the current session.
    pub fn new(
        base_url: &str,
        credentials: Credentials,
        cache: Option<SessionCache>,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let session = cache.as_ref().and_then(SessionCache::load);
        if let Some(ref s) = session {
            info!(user = %s.user_name, "restored cached session");
        }
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            session: RwLock::new(session),
            cache,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        let mut builder = self
            .client
            .request(method, url)
            .header(APPLICATION_KEY_HEADER, &self.credentials.application_key)
            .header(CLIENT_KEY_HEADER, &self.credentials.client_key);
        if let Some(session) = self.current_session() {
            builder = builder.header(SESSION_TOKEN_HEADER, session.token);
        }
        builder
    }

    fn set_session(&self, session: Option<Session>) {
        if let Some(cache) = &self.cache {
            let result = match &session {
                Some(s) => cache.store(s),
                None => cache.clear(),
            };
            if let Err(e) = result {
                warn!(error = %e, "failed to update session cache");
            }
        }
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }
}

/// Maps non-success statuses onto the service error taxonomy.
async fn check(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = format!("{status}: {body}");
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::Auth(detail),
        StatusCode::NOT_FOUND => ServiceError::NotFound(detail),
        StatusCode::CONFLICT => ServiceError::Conflict(detail),
        _ => ServiceError::Network(detail),
    })
}

#[async_trait]
impl RemoteDataService for HttpService {
    async fn query(&self, query: &Query) -> Result<Vec<Record>, ServiceError> {
        let where_clause = serde_json::to_string(&query.where_clause())?;
        debug!(class = %query.class_name, %where_clause, limit = query.limit, "query");
        let response = self
            .request(Method::GET, &format!("classes/{}", query.class_name))
            .query(&[("where", where_clause), ("limit", query.limit.to_string())])
            .send()
            .await?;
        let body: QueryResponse = check(response).await?.json().await?;
        body.results.into_iter().map(Record::from_json).collect()
    }

    async fn save(&self, class_name: &str, mut record: Record) -> Result<Record, ServiceError> {
        match record.object_id.clone() {
            None => {
                let response = self
                    .request(Method::POST, &format!("classes/{class_name}"))
                    .json(&record.to_body())
                    .send()
                    .await?;
                let created: CreateResponse = check(response).await?.json().await?;
                debug!(class = %class_name, id = %created.object_id, "record created");
                if let Some(date) = created.create_date {
                    record.set(CREATE_DATE, date);
                }
                record.object_id = Some(created.object_id);
            }
            Some(id) => {
                let response = self
                    .request(Method::PUT, &format!("classes/{class_name}/{id}"))
                    .json(&record.to_body())
                    .send()
                    .await?;
                let updated: UpdateResponse = check(response).await?.json().await?;
                debug!(class = %class_name, %id, "record updated");
                if let Some(date) = updated.update_date {
                    record.set(UPDATE_DATE, date);
                }
            }
        }
        Ok(record)
    }

    async fn delete(&self, class_name: &str, object_id: &str) -> Result<String, ServiceError> {
        let response = self
            .request(Method::DELETE, &format!("classes/{class_name}/{object_id}"))
            .send()
            .await?;
        check(response).await?;
        debug!(class = %class_name, id = %object_id, "record deleted");
        Ok(object_id.to_string())
    }

    async fn sign_up(&self, user_name: &str, password: &str) -> Result<(), ServiceError> {
        let response = self
            .request(Method::POST, "users")
            .json(&json!({ "userName": user_name, "password": password }))
            .send()
            .await?;
        check(response).await?;
        info!(user = %user_name, "user registered");
        Ok(())
    }

    async fn log_in(&self, user_name: &str, password: &str) -> Result<Session, ServiceError> {
        let response = self
            .request(Method::GET, "login")
            .query(&[("userName", user_name), ("password", password)])
            .send()
            .await?;
        let body: LoginResponse = check(response).await?.json().await?;
        let session = Session {
            user_id: body.object_id,
            user_name: body.user_name,
            token: body.session_token,
        };
        info!(user = %session.user_name, "logged in");
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    async fn log_out(&self) -> Result<(), ServiceError> {
        if self.current_session().is_none() {
            return Ok(());
        }
        // The request carries the old token. The local session is dropped
        // before sending, so a log-in made meanwhile is left alone.
        let request = self.request(Method::GET, "logout");
        self.set_session(None);
        let response = request.send().await?;
        check(response).await?;
        info!("logged out");
        Ok(())
    }

    fn current_session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
