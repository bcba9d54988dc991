use std::sync::Arc;

use chrono::TimeZone;
use tracing::{debug, info, warn};

use super::error::ScheduleError;
use super::event::{ScheduleEvent, END_DATE, SCHEDULE_CLASS, START_DATE};
use super::month::Month;
use crate::remote::query::MAX_LIMIT;
use crate::remote::record::encode_date;
use crate::remote::{Acl, Query, RemoteDataService, ServiceError};

/// Translates calendar actions into backend calls.
#[derive(Clone)]
pub struct ScheduleRepository {
    service: Arc<dyn RemoteDataService>,
}

impl ScheduleRepository {
    pub fn new(service: Arc<dyn RemoteDataService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<dyn RemoteDataService> {
        &self.service
    }

    /// Events of `month` as seen from `tz`, at most [`MAX_LIMIT`].
    ///
    /// The backend filters on `startDate >= monthStart` and
    /// `endDate < nextMonthStart`; anything whose start still falls
    /// outside the month window is dropped here.
    pub async fn fetch_month<Tz: TimeZone + Sync>(
        &self,
        month: Month,
        tz: &Tz,
    ) -> Result<Vec<ScheduleEvent>, ScheduleError> {
        let window = month.window(tz);
        let query = Query::new(SCHEDULE_CLASS)
            .greater_than_or_equal_to(START_DATE, encode_date(window.start))
            .less_than(END_DATE, encode_date(window.end))
            .limit(MAX_LIMIT);

        let records = self
            .service
            .query(&query)
            .await
            .map_err(|source| ScheduleError::Fetch { month, source })?;

        let total = records.len();
        let events: Vec<ScheduleEvent> = records
            .into_iter()
            .filter_map(ScheduleEvent::from_record)
            .filter(|e| window.contains(e.start))
            .collect();
        if events.len() != total {
            warn!(%month, dropped = total - events.len(), "discarded records outside the month");
        }
        debug!(%month, count = events.len(), "fetched schedules");
        Ok(events)
    }

    /// Stores `event` readable and writable by `user_id` only. Inserts
    /// drafts, updates saved events.
    pub async fn save(
        &self,
        event: &ScheduleEvent,
        user_id: &str,
    ) -> Result<ScheduleEvent, ScheduleError> {
        let mut event = event.clone();
        event.acl = Acl::owner_only(user_id);
        let record = self
            .service
            .save(SCHEDULE_CLASS, event.to_record())
            .await
            .map_err(ScheduleError::Save)?;
        let id = record.object_id.clone().filter(|id| !id.is_empty()).ok_or_else(|| {
            ScheduleError::Save(ServiceError::Decode("backend returned no object id".to_string()))
        })?;
        info!(%id, title = %event.title, "schedule saved");
        event.id = Some(id);
        Ok(event)
    }

    /// Deletes `event` and returns its id so the caller can evict it.
    pub async fn delete(&self, event: &ScheduleEvent) -> Result<String, ScheduleError> {
        let id = event.id.as_deref().ok_or(ScheduleError::Unsaved)?;
        let deleted = self
            .service
            .delete(SCHEDULE_CLASS, id)
            .await
            .map_err(ScheduleError::Delete)?;
        info!(id = %deleted, "schedule deleted");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MemoryService, Permission, Session};
    use chrono::{DateTime, Utc};

    fn at(m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, h, 0, 0).unwrap()
    }

    async fn setup() -> (ScheduleRepository, Session) {
        let service = Arc::new(MemoryService::new());
        service.sign_up("alice", "pw").await.unwrap();
        let session = service.log_in("alice", "pw").await.unwrap();
        (ScheduleRepository::new(service), session)
    }

    fn titled(title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> ScheduleEvent {
        let mut e = ScheduleEvent::draft(start, end);
        e.title = title.to_string();
        e
    }

    #[tokio::test]
    async fn fetch_month_only_returns_that_month() {
        let (repo, session) = setup().await;
        repo.save(&titled("march", at(3, 5, 10), at(3, 5, 11)), &session.user_id)
            .await
            .unwrap();
        repo.save(&titled("april", at(4, 1, 0), at(4, 1, 1)), &session.user_id)
            .await
            .unwrap();

        let march = Month::new(2024, 3).unwrap();
        let events = repo.fetch_month(march, &Utc).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "march");
        let window = march.window(&Utc);
        assert!(events.iter().all(|e| window.contains(e.start)));
    }

    #[tokio::test]
    async fn save_assigns_id_and_owner_acl() {
        let (repo, session) = setup().await;
        let saved = repo
            .save(&titled("x", at(3, 5, 10), at(3, 5, 11)), &session.user_id)
            .await
            .unwrap();
        assert!(saved.id.as_deref().is_some_and(|id| !id.is_empty()));
        assert_eq!(saved.acl.len(), 1);
        assert_eq!(
            saved.acl.get(&session.user_id),
            Some(Permission { read: true, write: true })
        );
    }

    #[tokio::test]
    async fn save_updates_existing_event_in_place() {
        let (repo, session) = setup().await;
        let mut saved = repo
            .save(&titled("before", at(3, 5, 10), at(3, 5, 11)), &session.user_id)
            .await
            .unwrap();
        saved.title = "after".into();
        let updated = repo.save(&saved, &session.user_id).await.unwrap();
        assert_eq!(updated.id, saved.id);

        let events = repo.fetch_month(Month::new(2024, 3).unwrap(), &Utc).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "after");
    }

    #[tokio::test]
    async fn second_delete_is_not_found() {
        let (repo, session) = setup().await;
        let saved = repo
            .save(&titled("x", at(3, 5, 10), at(3, 5, 11)), &session.user_id)
            .await
            .unwrap();

        assert_eq!(repo.delete(&saved).await.unwrap(), saved.id.clone().unwrap());
        let err = repo.delete(&saved).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn deleting_a_draft_is_rejected() {
        let (repo, _) = setup().await;
        let draft = titled("x", at(3, 5, 10), at(3, 5, 11));
        assert_eq!(repo.delete(&draft).await, Err(ScheduleError::Unsaved));
    }
}
