//! Room model.
//!
//! Rooms host sessions. Each room has a seat capacity and a validity window:
//! it exists only for the weeks of its window, which is how the mid-term
//! change of the room regime is expressed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::WeekWindow;

/// A teaching room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Unique room identifier.
    pub id: String,
    /// Seats available.
    pub capacity: u32,
    /// Weeks in which the room can be used.
    pub window: WeekWindow,
    /// Domain-specific metadata (building, floor, ...).
    pub attributes: HashMap<String, String>,
}

impl Room {
    /// Creates a room valid for weeks `[first, last]`.
    pub fn new(id: impl Into<String>, capacity: u32, first_week: u32, last_week: u32) -> Self {
        Self {
            id: id.into(),
            capacity,
            window: WeekWindow::new(first_week, last_week),
            attributes: HashMap::new(),
        }
    }

    /// Adds a domain-specific attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Whether the room exists in `week`.
    #[inline]
    pub fn is_valid_in(&self, week: u32) -> bool {
        self.window.contains(week)
    }

    /// Whether the room seats a group of `size`.
    #[inline]
    pub fn fits(&self, size: usize) -> bool {
        self.capacity as usize >= size
    }
}

/// Builds `count` identical rooms `<prefix>1..` valid for `[first, last]`.
pub fn room_pool(prefix: &str, count: usize, capacity: u32, first_week: u32, last_week: u32) -> Vec<Room> {
    (1..=count)
        .map(|i| Room::new(format!("{prefix}{i}"), capacity, first_week, last_week))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_validity() {
        let r = Room::new("R1", 70, 1, 4).with_attribute("building", "PAN-IIM");
        assert!(r.is_valid_in(1));
        assert!(r.is_valid_in(4));
        assert!(!r.is_valid_in(5));
        assert!(r.fits(70));
        assert!(!r.fits(71));
        assert_eq!(r.attributes["building"], "PAN-IIM");
    }

    #[test]
    fn test_room_pool() {
        let rooms = room_pool("L", 4, 80, 5, 10);
        assert_eq!(rooms.len(), 4);
        assert_eq!(rooms[0].id, "L1");
        assert_eq!(rooms[3].id, "L4");
        assert!(rooms.iter().all(|r| r.is_valid_in(7) && !r.is_valid_in(4)));
    }

    #[test]
    fn test_room_equality() {
        let a = Room::new("R1", 70, 1, 4).with_attribute("building", "PAN-IIM");
        assert_eq!(a, a.clone());
        assert_ne!(a, Room::new("R1", 70, 1, 4));
        assert_ne!(a, Room::new("R1", 70, 1, 5).with_attribute("building", "PAN-IIM"));
    }
}
