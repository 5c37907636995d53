use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use booking_cell::models::{Booking, TimeSlot};
use booking_cell::store::{BookingStore, PostgrestBookingStore, SlotOwner};
use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{
    AvailabilityError, AvailabilityWindow, BookableSlot, SetAvailabilityRequest, WindowSpec,
};

const DEFAULT_SLOT_MINUTES: u32 = 30;
const MAX_SLOT_MINUTES: u32 = 1440;
const MAX_RANGE_DAYS: i64 = 31;

pub struct AvailabilityService {
    postgrest: PostgrestClient,
    store: Arc<dyn BookingStore>,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            postgrest: PostgrestClient::new(config),
            store: Arc::new(PostgrestBookingStore::new(config)),
        }
    }

    /// Replace a doctor's weekly windows with the submitted set.
    pub async fn set_windows(
        &self,
        doctor_id: Uuid,
        request: SetAvailabilityRequest,
    ) -> Result<Vec<AvailabilityWindow>, AvailabilityError> {
        debug!("Replacing availability windows for doctor {}", doctor_id);

        let parsed = Self::validate_windows(&request.windows)?;

        // Wholesale replace: clear the doctor's windows, then insert the new
        // set in one bulk request.
        let delete_path = format!("/rest/v1/availability_windows?doctor_id=eq.{}", doctor_id);
        let _: Vec<Value> = self
            .postgrest
            .request_with_headers(
                Method::DELETE,
                &delete_path,
                None,
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

        if parsed.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<Value> = parsed
            .iter()
            .map(|(day_of_week, start, end)| {
                json!({
                    "id": Uuid::new_v4(),
                    "doctor_id": doctor_id,
                    "day_of_week": day_of_week,
                    "start_time": start.format("%H:%M").to_string(),
                    "end_time": end.format("%H:%M").to_string(),
                })
            })
            .collect();

        let result: Vec<Value> = self
            .postgrest
            .request_with_headers(
                Method::POST,
                "/rest/v1/availability_windows",
                Some(Value::Array(rows)),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

        let windows: Vec<AvailabilityWindow> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<AvailabilityWindow>, _>>()
            .map_err(|e| AvailabilityError::DatabaseError(format!("Failed to parse windows: {}", e)))?;

        Ok(windows)
    }

    /// Current weekly windows, ordered by day then start time.
    pub async fn get_windows(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<AvailabilityWindow>, AvailabilityError> {
        let path = format!(
            "/rest/v1/availability_windows?doctor_id=eq.{}&order=day_of_week.asc,start_time.asc",
            doctor_id
        );

        let result: Vec<Value> = self
            .postgrest
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

        let windows: Vec<AvailabilityWindow> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<AvailabilityWindow>, _>>()
            .map_err(|e| AvailabilityError::DatabaseError(format!("Failed to parse windows: {}", e)))?;

        Ok(windows)
    }

    /// Expand the doctor's windows over an inclusive date range into
    /// `slot_minutes` slices, each flagged against the doctor's non-cancelled
    /// bookings.
    pub async fn bookable_slots(
        &self,
        doctor_id: Uuid,
        from: &str,
        to: &str,
        slot_minutes: Option<u32>,
    ) -> Result<Vec<BookableSlot>, AvailabilityError> {
        let slot_minutes = slot_minutes.unwrap_or(DEFAULT_SLOT_MINUTES);
        if slot_minutes == 0 || slot_minutes > MAX_SLOT_MINUTES {
            return Err(AvailabilityError::InvalidDate(format!(
                "slot_minutes must be between 1 and {}",
                MAX_SLOT_MINUTES
            )));
        }

        let from_date = NaiveDate::parse_from_str(from, "%Y-%m-%d")
            .map_err(|_| AvailabilityError::InvalidDate(from.to_string()))?;
        let to_date = NaiveDate::parse_from_str(to, "%Y-%m-%d")
            .map_err(|_| AvailabilityError::InvalidDate(to.to_string()))?;

        if to_date < from_date {
            return Err(AvailabilityError::InvalidDate(
                "Date range is inverted".to_string(),
            ));
        }
        if (to_date - from_date).num_days() + 1 > MAX_RANGE_DAYS {
            return Err(AvailabilityError::InvalidDate(format!(
                "Date range cannot exceed {} days",
                MAX_RANGE_DAYS
            )));
        }

        let windows = self.get_windows(doctor_id).await?;
        if windows.is_empty() {
            return Ok(Vec::new());
        }

        // One scan of the doctor's calendar covers the whole range; each
        // slice is then flagged in memory.
        let range_end = to_date
            .succ_opt()
            .ok_or_else(|| AvailabilityError::InvalidDate(to.to_string()))?;
        let range = TimeSlot {
            start: from_date.and_time(NaiveTime::MIN).and_utc(),
            end: range_end.and_time(NaiveTime::MIN).and_utc(),
        };

        let booked = self
            .store
            .find_overlapping(SlotOwner::Doctor(doctor_id), &range)
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

        Ok(project_slots(&windows, from_date, to_date, slot_minutes, &booked))
    }

    /// Validate submitted windows and parse their times. Rejects bad days,
    /// malformed or inverted times, and same-day overlaps.
    fn validate_windows(
        windows: &[WindowSpec],
    ) -> Result<Vec<(u8, NaiveTime, NaiveTime)>, AvailabilityError> {
        let mut parsed = Vec::with_capacity(windows.len());

        for window in windows {
            if window.day_of_week > 6 {
                return Err(AvailabilityError::InvalidWindow(
                    "Day of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
                ));
            }

            let start = NaiveTime::parse_from_str(&window.start_time, "%H:%M").map_err(|_| {
                AvailabilityError::InvalidWindow(format!(
                    "Times must be HH:MM, got {}",
                    window.start_time
                ))
            })?;
            let end = NaiveTime::parse_from_str(&window.end_time, "%H:%M").map_err(|_| {
                AvailabilityError::InvalidWindow(format!(
                    "Times must be HH:MM, got {}",
                    window.end_time
                ))
            })?;

            if start >= end {
                return Err(AvailabilityError::InvalidWindow(
                    "Start time must be before end time".to_string(),
                ));
            }

            parsed.push((window.day_of_week, start, end));
        }

        for (i, a) in parsed.iter().enumerate() {
            for b in &parsed[i + 1..] {
                if a.0 == b.0 && a.1 < b.2 && b.1 < a.2 {
                    return Err(AvailabilityError::InvalidWindow(format!(
                        "Windows overlap on day {}",
                        a.0
                    )));
                }
            }
        }

        Ok(parsed)
    }

    fn representation_headers() -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );
        headers
    }
}

/// Expand weekly windows into concrete slices over an inclusive date range,
/// flagging each slice that overlaps an active booking. Slices that would
/// poke past the end of their window are dropped.
pub fn project_slots(
    windows: &[AvailabilityWindow],
    from_date: NaiveDate,
    to_date: NaiveDate,
    slot_minutes: u32,
    booked: &[Booking],
) -> Vec<BookableSlot> {
    let duration = Duration::minutes(slot_minutes as i64);
    let mut slots = Vec::new();

    let mut day = from_date;
    while day <= to_date {
        let day_of_week = day.weekday().num_days_from_sunday() as u8;

        for window in windows.iter().filter(|w| w.day_of_week == day_of_week) {
            let start = match NaiveTime::parse_from_str(&window.start_time, "%H:%M") {
                Ok(t) => t,
                Err(_) => {
                    warn!("Skipping window {} with bad start_time", window.id);
                    continue;
                }
            };
            let end = match NaiveTime::parse_from_str(&window.end_time, "%H:%M") {
                Ok(t) => t,
                Err(_) => {
                    warn!("Skipping window {} with bad end_time", window.id);
                    continue;
                }
            };

            let window_end = day.and_time(end).and_utc();
            let mut current = day.and_time(start).and_utc();

            while current + duration <= window_end {
                let slot_end = current + duration;
                let is_booked = booked.iter().any(|b| {
                    b.status.is_active() && current < b.slot.end && b.slot.start < slot_end
                });

                slots.push(BookableSlot {
                    start: current,
                    end: slot_end,
                    is_booked,
                });

                current = slot_end;
            }
        }

        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    slots.sort_by_key(|s| s.start);
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_cell::models::BookingStatus;
    use chrono::{TimeZone, Utc};

    fn window(day_of_week: u8, start_time: &str, end_time: &str) -> AvailabilityWindow {
        AvailabilityWindow {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            day_of_week,
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
        }
    }

    fn booking(start: chrono::DateTime<Utc>, end: chrono::DateTime<Utc>) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            slot: TimeSlot { start, end },
            status: BookingStatus::Confirmed,
            reason: "Checkup".to_string(),
            note: None,
            created_at: Utc::now(),
        }
    }

    // 2025-03-03 is a Monday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    #[test]
    fn slices_window_into_even_slots() {
        let windows = vec![window(1, "09:00", "11:00")];
        let slots = project_slots(&windows, monday(), monday(), 30, &[]);

        assert_eq!(slots.len(), 4);
        assert_eq!(slots[0].start, Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap());
        assert_eq!(slots[3].end, Utc.with_ymd_and_hms(2025, 3, 3, 11, 0, 0).unwrap());
        assert!(slots.iter().all(|s| !s.is_booked));
    }

    #[test]
    fn drops_partial_slot_at_window_end() {
        let windows = vec![window(1, "09:00", "10:15")];
        let slots = project_slots(&windows, monday(), monday(), 30, &[]);

        // 09:00-09:30 and 09:30-10:00 fit; 10:00-10:30 would poke past.
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1].end, Utc.with_ymd_and_hms(2025, 3, 3, 10, 0, 0).unwrap());
    }

    #[test]
    fn flags_slots_overlapping_bookings() {
        let windows = vec![window(1, "09:00", "11:00")];
        let booked = vec![booking(
            Utc.with_ymd_and_hms(2025, 3, 3, 9, 45, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 3, 10, 15, 0).unwrap(),
        )];

        let slots = project_slots(&windows, monday(), monday(), 30, &booked);

        // The 09:30 and 10:00 slices overlap the booking; the rest are free.
        assert_eq!(
            slots.iter().map(|s| s.is_booked).collect::<Vec<_>>(),
            vec![false, true, true, false]
        );
    }

    #[test]
    fn adjacent_booking_does_not_flag_slot() {
        let windows = vec![window(1, "09:00", "10:00")];
        let booked = vec![booking(
            Utc.with_ymd_and_hms(2025, 3, 3, 10, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 3, 10, 30, 0).unwrap(),
        )];

        let slots = project_slots(&windows, monday(), monday(), 30, &booked);

        assert_eq!(slots.len(), 2);
        assert!(!slots[1].is_booked);
    }

    #[test]
    fn cancelled_bookings_do_not_flag_slots() {
        let windows = vec![window(1, "09:00", "10:00")];
        let mut cancelled = booking(
            Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 3, 10, 0, 0).unwrap(),
        );
        cancelled.status = BookingStatus::Cancelled;

        let slots = project_slots(&windows, monday(), monday(), 30, &[cancelled]);

        assert!(slots.iter().all(|s| !s.is_booked));
    }

    #[test]
    fn expands_only_matching_weekdays_across_range() {
        // Monday-only window projected over Monday through Wednesday.
        let windows = vec![window(1, "09:00", "10:00")];
        let to = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();

        let slots = project_slots(&windows, monday(), to, 30, &[]);

        assert_eq!(slots.len(), 2);
        assert!(slots.iter().all(|s| s.start.date_naive() == monday()));
    }

    #[test]
    fn validate_rejects_inverted_window() {
        let windows = vec![WindowSpec {
            day_of_week: 1,
            start_time: "10:00".to_string(),
            end_time: "09:00".to_string(),
        }];
        assert!(matches!(
            AvailabilityService::validate_windows(&windows),
            Err(AvailabilityError::InvalidWindow(_))
        ));
    }

    #[test]
    fn validate_rejects_bad_day_and_bad_time() {
        let bad_day = vec![WindowSpec {
            day_of_week: 7,
            start_time: "09:00".to_string(),
            end_time: "10:00".to_string(),
        }];
        assert!(AvailabilityService::validate_windows(&bad_day).is_err());

        let bad_time = vec![WindowSpec {
            day_of_week: 1,
            start_time: "9am".to_string(),
            end_time: "10:00".to_string(),
        }];
        assert!(AvailabilityService::validate_windows(&bad_time).is_err());
    }

    #[test]
    fn validate_rejects_same_day_overlap() {
        let windows = vec![
            WindowSpec {
                day_of_week: 1,
                start_time: "09:00".to_string(),
                end_time: "12:00".to_string(),
            },
            WindowSpec {
                day_of_week: 1,
                start_time: "11:00".to_string(),
                end_time: "13:00".to_string(),
            },
        ];
        assert!(matches!(
            AvailabilityService::validate_windows(&windows),
            Err(AvailabilityError::InvalidWindow(_))
        ));
    }

    #[test]
    fn validate_accepts_touching_windows() {
        let windows = vec![
            WindowSpec {
                day_of_week: 1,
                start_time: "09:00".to_string(),
                end_time: "12:00".to_string(),
            },
            WindowSpec {
                day_of_week: 1,
                start_time: "12:00".to_string(),
                end_time: "15:00".to_string(),
            },
        ];
        assert!(AvailabilityService::validate_windows(&windows).is_ok());
    }
}
