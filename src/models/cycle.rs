use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::db::DatabaseError;

/// A monthly compliance cycle, written `YYYY-MM`.
///
/// Ordering follows the calendar, which is also the lexicographic order of
/// the textual form stored in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cycle {
    year: u16,
    month: u8,
}

impl Cycle {
    pub fn new(year: u16, month: u8) -> Result<Self, DatabaseError> {
        if !(1..=12).contains(&month) || !(1000..=9999).contains(&year) {
            return Err(DatabaseError::InvalidInput(format!(
                "invalid cycle {year:04}-{month:02}"
            )));
        }
        Ok(Self { year, month })
    }

    /// The cycle containing today's local date.
    pub fn current() -> Self {
        let today = Local::now().date_naive();
        Self {
            year: today.year() as u16,
            month: today.month() as u8,
        }
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    /// Display label, `MM/YYYY`.
    pub fn label(&self) -> String {
        format!("{:02}/{:04}", self.month, self.year)
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Cycle {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DatabaseError::InvalidInput(format!("cycle must be YYYY-MM, got '{s}'"));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: u16 = year.parse().map_err(|_| invalid())?;
        let month: u8 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl Serialize for Cycle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cycle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_year_month() {
        let cycle: Cycle = "2024-03".parse().unwrap();
        assert_eq!(cycle.year(), 2024);
        assert_eq!(cycle.month(), 3);
        assert_eq!(cycle.to_string(), "2024-03");
        assert_eq!(cycle.label(), "03/2024");
    }

    #[test]
    fn rejects_malformed_cycles() {
        for bad in ["2024-13", "2024-00", "24-01", "2024-1", "2024/01", "", "abcd-ef"] {
            assert!(bad.parse::<Cycle>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn ordering_is_chronological() {
        let a: Cycle = "2023-12".parse().unwrap();
        let b: Cycle = "2024-01".parse().unwrap();
        assert!(a < b);
        assert!(a.to_string() < b.to_string());
    }

    #[test]
    fn serde_uses_text_form() {
        let cycle: Cycle = "2025-07".parse().unwrap();
        let json = serde_json::to_string(&cycle).unwrap();
        assert_eq!(json, "\"2025-07\"");
        let back: Cycle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cycle);
    }

    #[test]
    fn current_cycle_is_valid() {
        let cycle = Cycle::current();
        assert!((1..=12).contains(&cycle.month()));
        assert_eq!(cycle.to_string().parse::<Cycle>().unwrap(), cycle);
    }
}
