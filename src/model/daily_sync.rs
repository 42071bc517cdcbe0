//! Daily check-in model.
//!
//! One entry per owner per calendar day, recording an energy level and an
//! optional reflection.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::record::{CollectionSchema, DAILY_SYNCS, Entity};
use crate::error::{Error, Result};

/// A daily check-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySync {
    pub id: String,

    pub user_id: String,

    /// Energy level, 1-5
    pub energy_level: u8,

    #[serde(default)]
    pub reflection: Option<String>,

    /// Calendar day, `YYYY-MM-DD`
    pub sync_date: String,

    #[serde(default)]
    pub created_at: String,

    #[serde(default)]
    pub updated_at: String,
}

/// Fields supplied when creating a check-in.
#[derive(Debug, Clone, Serialize)]
pub struct NewDailySync {
    pub energy_level: u8,
    pub reflection: Option<String>,
    pub sync_date: String,
}

/// Partial update for a check-in.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DailySyncPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_level: Option<u8>,
    /// `Some(None)` clears the reflection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection: Option<Option<String>>,
}

/// Today's date in the local timezone, `YYYY-MM-DD`.
#[must_use]
pub fn today() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

impl Entity for DailySync {
    const SCHEMA: &'static CollectionSchema = &DAILY_SYNCS;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        if !(1..=5).contains(&self.energy_level) {
            return Err(Error::invalid_record(
                DAILY_SYNCS.name,
                format!("energy_level must be 1-5, got {}", self.energy_level),
            ));
        }
        if NaiveDate::parse_from_str(&self.sync_date, "%Y-%m-%d").is_err() {
            return Err(Error::invalid_record(
                DAILY_SYNCS.name,
                format!("sync_date must be YYYY-MM-DD, got '{}'", self.sync_date),
            ));
        }
        Ok(())
    }

    /// Newest day first.
    fn ordering(a: &Self, b: &Self) -> Ordering {
        b.sync_date.cmp(&a.sync_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sync(date: &str, energy: u8) -> DailySync {
        DailySync {
            id: format!("d-{date}"),
            user_id: "u1".into(),
            energy_level: energy,
            reflection: None,
            sync_date: date.into(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_validate() {
        assert!(sync("2025-02-01", 3).validate().is_ok());
        assert!(sync("2025-02-01", 0).validate().is_err());
        assert!(sync("Feb 1", 3).validate().is_err());
    }

    #[test]
    fn test_ordering_newest_first() {
        let mut items = vec![sync("2025-01-30", 2), sync("2025-02-01", 4), sync("2025-01-31", 3)];
        items.sort_by(DailySync::ordering);
        let dates: Vec<_> = items.iter().map(|s| s.sync_date.as_str()).collect();
        assert_eq!(dates, ["2025-02-01", "2025-01-31", "2025-01-30"]);
    }

    #[test]
    fn test_patch_can_clear_reflection() {
        let patch = DailySyncPatch {
            reflection: Some(None),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({"reflection": null})
        );
    }
}
