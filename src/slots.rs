//! Slot calendar: the discrete (week, day, period) grid of the term and the
//! room pool of every week.
//!
//! Rooms carry their own validity window, so the change between the early
//! and the late room regime is simply which rooms are valid in a week.
//! Generation is deterministic: slots are enumerated week-major, then by
//! day and period; each week's pool is sorted by capacity ascending, then by
//! room id, so the first fitting room is the best fit.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CalendarConfig;
use crate::error::{Result, TimetableError};
use crate::models::{Room, TimeSlot};

/// Room regime active in a week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Regime {
    Early,
    Late,
}

/// Enumerated timeslots with their room pools.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotCalendar {
    weeks: u32,
    early_regime_last_week: u32,
    day_labels: Vec<String>,
    rooms: Vec<Room>,
    slots: Vec<TimeSlot>,
    /// Room indices valid per week (index `week - 1`), capacity ascending.
    week_pools: Vec<Vec<usize>>,
}

impl SlotCalendar {
    /// Generates the term grid.
    ///
    /// # Errors
    /// `EmptyRoomPool` if some week of the term has no valid room.
    pub fn generate(calendar: &CalendarConfig, rooms: &[Room]) -> Result<Self> {
        let mut sorted: Vec<Room> = rooms.to_vec();
        sorted.sort_by(|a, b| a.capacity.cmp(&b.capacity).then_with(|| a.id.cmp(&b.id)));

        let mut week_pools = Vec::with_capacity(calendar.weeks as usize);
        for week in 1..=calendar.weeks {
            let pool: Vec<usize> = sorted
                .iter()
                .enumerate()
                .filter(|(_, r)| r.is_valid_in(week))
                .map(|(i, _)| i)
                .collect();
            if pool.is_empty() {
                return Err(TimetableError::EmptyRoomPool { week });
            }
            week_pools.push(pool);
        }

        let mut slots = Vec::with_capacity(calendar.slots_per_term());
        for week in 1..=calendar.weeks {
            for (day, &periods) in calendar.periods_per_day.iter().enumerate() {
                for period in 0..periods {
                    slots.push(TimeSlot::new(week, day as u8, period));
                }
            }
        }

        debug!(
            slots = slots.len(),
            rooms = sorted.len(),
            early_rooms = week_pools.first().map_or(0, Vec::len),
            late_rooms = week_pools.last().map_or(0, Vec::len),
            "slot calendar generated"
        );

        Ok(Self {
            weeks: calendar.weeks,
            early_regime_last_week: calendar.early_regime_last_week,
            day_labels: calendar.day_labels.clone(),
            rooms: sorted,
            slots,
            week_pools,
        })
    }

    /// All timeslots in term order.
    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Timeslot by index.
    pub fn slot(&self, t: usize) -> TimeSlot {
        self.slots[t]
    }

    /// Index of a timeslot, if it is part of the grid.
    pub fn index_of(&self, slot: &TimeSlot) -> Option<usize> {
        self.slots.binary_search(slot).ok()
    }

    /// Number of weeks in the term.
    pub fn weeks(&self) -> u32 {
        self.weeks
    }

    /// Rooms known to the calendar, capacity ascending.
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn room(&self, r: usize) -> &Room {
        &self.rooms[r]
    }

    /// Valid room indices in `week`, capacity ascending.
    pub fn week_pool(&self, week: u32) -> &[usize] {
        week.checked_sub(1)
            .and_then(|w| self.week_pools.get(w as usize))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Valid room indices of slot `t`.
    pub fn room_pool(&self, t: usize) -> &[usize] {
        self.week_pool(self.slots[t].week)
    }

    /// Valid rooms of slot `t` seating at least `min_capacity`, best fit first.
    pub fn fitting_rooms(&self, t: usize, min_capacity: usize) -> &[usize] {
        let pool = self.room_pool(t);
        let first = pool.partition_point(|&r| !self.rooms[r].fits(min_capacity));
        &pool[first..]
    }

    /// Regime of a week.
    pub fn regime(&self, week: u32) -> Regime {
        if week <= self.early_regime_last_week {
            Regime::Early
        } else {
            Regime::Late
        }
    }

    /// Label of a day index (`Mon`, ...).
    pub fn day_label(&self, day: u8) -> &str {
        self.day_labels
            .get(day as usize)
            .map_or("?", String::as_str)
    }

    /// The `limit` largest rooms valid in the final week, capacity ascending.
    pub fn final_week_rooms(&self, limit: Option<usize>) -> &[usize] {
        let pool = self.week_pool(self.weeks);
        let keep = limit.map_or(pool.len(), |m| m.min(pool.len()));
        &pool[pool.len() - keep..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::room_pool;

    fn regime_rooms() -> Vec<Room> {
        let mut rooms = room_pool("E", 10, 80, 1, 4);
        rooms.extend(room_pool("L", 4, 80, 5, 10));
        rooms
    }

    #[test]
    fn test_default_grid() {
        let cal = SlotCalendar::generate(&CalendarConfig::default(), &regime_rooms()).unwrap();
        assert_eq!(cal.slot_count(), 400);
        assert_eq!(cal.slot(0), TimeSlot::new(1, 0, 0));
        // Sunday has four periods
        assert_eq!(cal.slot(39), TimeSlot::new(1, 6, 3));
        assert_eq!(cal.slot(40), TimeSlot::new(2, 0, 0));
        assert_eq!(cal.room_pool(0).len(), 10);
        assert_eq!(cal.week_pool(5).len(), 4);
        assert_eq!(cal.regime(4), Regime::Early);
        assert_eq!(cal.regime(5), Regime::Late);
        assert_eq!(cal.day_label(6), "Sun");
    }

    #[test]
    fn test_generation_is_idempotent() {
        let config = CalendarConfig::default();
        let rooms = regime_rooms();
        let a = SlotCalendar::generate(&config, &rooms).unwrap();
        let b = SlotCalendar::generate(&config, &rooms).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_week_is_fatal() {
        let rooms = room_pool("E", 3, 80, 1, 4);
        let err = SlotCalendar::generate(&CalendarConfig::default(), &rooms).unwrap_err();
        assert!(matches!(err, TimetableError::EmptyRoomPool { week: 5 }));
    }

    #[test]
    fn test_fitting_rooms_best_fit_first() {
        let rooms = vec![
            Room::new("big", 100, 1, 2),
            Room::new("small", 30, 1, 2),
            Room::new("mid", 60, 1, 2),
        ];
        let cal = SlotCalendar::generate(&CalendarConfig::uniform(2, 1, 1, 1), &rooms).unwrap();
        let ids: Vec<&str> = cal
            .fitting_rooms(0, 50)
            .iter()
            .map(|&r| cal.room(r).id.as_str())
            .collect();
        assert_eq!(ids, vec!["mid", "big"]);
        assert!(cal.fitting_rooms(0, 101).is_empty());
        let largest: Vec<&str> = cal
            .final_week_rooms(Some(2))
            .iter()
            .map(|&r| cal.room(r).id.as_str())
            .collect();
        assert_eq!(largest, vec!["mid", "big"]);
        assert_eq!(cal.final_week_rooms(None).len(), 3);
        assert_eq!(cal.final_week_rooms(Some(0)).len(), 0);
    }

    #[test]
    fn test_index_of() {
        let cal = SlotCalendar::generate(&CalendarConfig::default(), &regime_rooms()).unwrap();
        assert_eq!(cal.index_of(&TimeSlot::new(2, 0, 0)), Some(40));
        assert_eq!(cal.index_of(&TimeSlot::new(1, 6, 5)), None);
        assert!(cal.week_pool(11).is_empty());
    }
}
