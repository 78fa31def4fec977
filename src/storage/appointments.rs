use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::db::{load_db, save_db, DBError, DB};
use crate::error::StoreError;
use crate::models::appointment::{Appointment, AppointmentStatus, BookingDetails, ExistingAppointment};
use crate::models::time_window::intervals_overlap;
use crate::service::ports::AppointmentStore;

/// Appointment store backed by an in-process map, optionally mirrored to
/// a JSON file. The overlap check and the insert happen under one lock,
/// so concurrent bookings of the same interval cannot both succeed.
pub struct LocalAppointmentStore {
    db: Mutex<DB<Appointment>>,
    location: Option<String>,
}

impl LocalAppointmentStore {
    pub fn in_memory() -> Self {
        Self {
            db: Mutex::new(DB::new()),
            location: None,
        }
    }

    pub fn open(location: &str) -> Result<Self, DBError> {
        Ok(Self {
            db: Mutex::new(load_db(location)?),
            location: Some(location.to_string()),
        })
    }

    fn persist(&self, db: &DB<Appointment>) -> Result<(), StoreError> {
        match &self.location {
            Some(location) => save_db(location, db).map_err(|e| StoreError::Unavailable(e.to_string())),
            None => Ok(()),
        }
    }

    /// All records of a calendar, cancelled included, ordered by start.
    pub async fn appointments_for(&self, calendar_id: &str) -> Vec<Appointment> {
        let db = self.db.lock().await;
        let mut appointments: Vec<Appointment> = db
            .values()
            .filter(|apt| apt.calendar_id == calendar_id)
            .cloned()
            .collect();
        appointments.sort_by_key(|apt| apt.start_time);
        appointments
    }
}

#[async_trait]
impl AppointmentStore for LocalAppointmentStore {
    async fn list_appointments(
        &self,
        calendar_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ExistingAppointment>, StoreError> {
        let db = self.db.lock().await;
        let mut existing: Vec<ExistingAppointment> = db
            .values()
            .filter(|apt| apt.calendar_id == calendar_id && apt.status.is_active())
            .filter(|apt| intervals_overlap(start, end, apt.start_time, apt.end_time))
            .map(Appointment::as_existing)
            .collect();
        existing.sort_by_key(|apt| apt.start_time);
        Ok(existing)
    }

    async fn create_appointment(
        &self,
        calendar_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        details: &BookingDetails,
    ) -> Result<Appointment, StoreError> {
        let mut db = self.db.lock().await;
        let conflict = db.values().any(|apt| {
            apt.calendar_id == calendar_id
                && apt.status.is_active()
                && intervals_overlap(start, end, apt.start_time, apt.end_time)
        });
        if conflict {
            return Err(StoreError::Conflict);
        }

        let appointment = Appointment::new(calendar_id, start, end, details.clone(), Utc::now());
        db.insert(appointment.id.clone(), appointment.clone());
        if let Err(err) = self.persist(&db) {
            db.remove(&appointment.id);
            return Err(err);
        }
        Ok(appointment)
    }

    async fn get_appointment(&self, appointment_id: &str) -> Result<Appointment, StoreError> {
        let db = self.db.lock().await;
        db.get(appointment_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("appointment {}", appointment_id)))
    }

    async fn cancel_appointment(&self, appointment_id: &str) -> Result<Appointment, StoreError> {
        let mut db = self.db.lock().await;
        let Some(appointment) = db.get_mut(appointment_id) else {
            return Err(StoreError::NotFound(format!("appointment {}", appointment_id)));
        };
        if appointment.status == AppointmentStatus::Cancelled {
            return Ok(appointment.clone());
        }
        let previous = appointment.status;
        appointment.status = AppointmentStatus::Cancelled;
        let cancelled = appointment.clone();
        if let Err(err) = self.persist(&db) {
            if let Some(appointment) = db.get_mut(appointment_id) {
                appointment.status = previous;
            }
            return Err(err);
        }
        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::env;
    use std::sync::Arc;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, 0).unwrap()
    }

    fn ada() -> BookingDetails {
        BookingDetails::new("Ada", "ada@example.com")
    }

    #[tokio::test]
    async fn insert_rejects_overlap_on_same_calendar_only() {
        let store = LocalAppointmentStore::in_memory();
        store.create_appointment("cal-1", at(9, 0), at(9, 30), &ada()).await.unwrap();

        let clash = store.create_appointment("cal-1", at(9, 15), at(9, 45), &ada()).await;
        assert_eq!(clash, Err(StoreError::Conflict));

        assert!(store.create_appointment("cal-1", at(9, 30), at(10, 0), &ada()).await.is_ok());
        assert!(store.create_appointment("cal-2", at(9, 0), at(9, 30), &ada()).await.is_ok());
    }

    #[tokio::test]
    async fn cancelled_appointments_free_their_interval() {
        let store = LocalAppointmentStore::in_memory();
        let apt = store.create_appointment("cal-1", at(9, 0), at(9, 30), &ada()).await.unwrap();

        let cancelled = store.cancel_appointment(&apt.id).await.unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        let again = store.cancel_appointment(&apt.id).await.unwrap();
        assert_eq!(again.status, AppointmentStatus::Cancelled);

        let listed = store.list_appointments("cal-1", at(8, 0), at(12, 0)).await.unwrap();
        assert!(listed.is_empty());
        assert!(store.create_appointment("cal-1", at(9, 0), at(9, 30), &ada()).await.is_ok());
        assert_eq!(store.appointments_for("cal-1").await.len(), 2);
    }

    #[tokio::test]
    async fn list_returns_only_overlapping_range() {
        let store = LocalAppointmentStore::in_memory();
        store.create_appointment("cal-1", at(9, 0), at(9, 30), &ada()).await.unwrap();
        store.create_appointment("cal-1", at(11, 0), at(11, 30), &ada()).await.unwrap();

        let listed = store.list_appointments("cal-1", at(9, 30), at(11, 0)).await.unwrap();
        assert!(listed.is_empty());
        let listed = store.list_appointments("cal-1", at(9, 0), at(11, 1)).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].start_time < listed[1].start_time);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let store = LocalAppointmentStore::in_memory();
        assert!(matches!(store.get_appointment("missing").await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.cancel_appointment("missing").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn concurrent_inserts_of_same_slot_admit_one() {
        let store = Arc::new(LocalAppointmentStore::in_memory());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create_appointment("cal-1", at(9, 0), at(9, 30), &ada()).await
            }));
        }
        let mut booked = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => booked += 1,
                Err(err) => assert_eq!(err, StoreError::Conflict),
            }
        }
        assert_eq!(booked, 1);
    }

    #[tokio::test]
    async fn persisted_store_reloads_appointments() {
        let dir = env::temp_dir().join(format!("appointment_engine_store_{}", uuid::Uuid::new_v4()));
        let location = dir.to_str().unwrap().to_string();
        {
            let store = LocalAppointmentStore::open(&location).unwrap();
            store.create_appointment("cal-1", at(9, 0), at(9, 30), &ada()).await.unwrap();
        }
        let reopened = LocalAppointmentStore::open(&location).unwrap();
        let listed = reopened
            .list_appointments("cal-1", at(0, 0), at(0, 0) + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(listed, vec![ExistingAppointment::new(at(9, 0), at(9, 30))]);
        let _ = std::fs::remove_dir_all(dir);
    }
}
