use chrono::{DateTime, Local, Utc};

use crate::remote::record::Record;
use crate::remote::Acl;

/// Backend class holding calendar entries.
pub const SCHEDULE_CLASS: &str = "Schedule";

const TITLE: &str = "title";
const BODY: &str = "body";
pub(crate) const START_DATE: &str = "startDate";
pub(crate) const END_DATE: &str = "endDate";

/// One calendar entry. `id` is `None` until the backend has stored it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEvent {
    pub id: Option<String>,
    pub title: String,
    pub body: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub acl: Acl,
}

impl ScheduleEvent {
    /// Unsaved draft covering `[start, end)`.
    pub fn draft(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id: None,
            title: String::new(),
            body: String::new(),
            start,
            end,
            acl: Acl::new(),
        }
    }

    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }

    pub fn local_start(&self) -> DateTime<Local> {
        self.start.with_timezone(&Local)
    }

    pub fn local_end(&self) -> DateTime<Local> {
        self.end.with_timezone(&Local)
    }

    pub fn duration_display(&self) -> String {
        let start = self.local_start().format("%H:%M");
        let end = self.local_end().format("%H:%M");
        format!("{} - {}", start, end)
    }

    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.object_id = self.id.clone();
        record.set(TITLE, self.title.as_str());
        record.set(BODY, self.body.as_str());
        record.set_date(START_DATE, self.start);
        record.set_date(END_DATE, self.end);
        record.acl = self.acl.clone();
        record
    }

    /// `None` when the record lacks a start or end date; text fields
    /// default to empty.
    pub fn from_record(record: Record) -> Option<Self> {
        let start = record.get_date(START_DATE)?;
        let end = record.get_date(END_DATE)?;
        Some(Self {
            title: record.get_str(TITLE).unwrap_or_default().to_string(),
            body: record.get_str(BODY).unwrap_or_default().to_string(),
            id: record.object_id,
            start,
            end,
            acl: record.acl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn record_conversion_keeps_every_field() {
        let mut event = ScheduleEvent::draft(
            Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap(),
        );
        event.id = Some("abc".into());
        event.title = "Standup".into();
        event.body = "daily".into();
        event.acl = Acl::owner_only("u1");

        let back = ScheduleEvent::from_record(event.to_record()).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn record_without_dates_is_skipped() {
        let mut record = Record::new();
        record.set("title", "broken");
        assert!(ScheduleEvent::from_record(record).is_none());
    }
}
