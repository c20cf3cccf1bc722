//! Event store models
//!
//! The named event record and its fixed display metadata. The on-disk
//! representation (positional fields, "True"/"False" booleans) is confined
//! to the row mapping here; everything held in memory is typed.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Column labels for the seven display fields, in row order.
pub const HEADERS: [&str; 7] = [
    "Event Name",
    "Date Due",
    "Time Due",
    "Category",
    "Recurring",
    "Notes",
    "Left",
];

/// Accepted event categories for populating a selector.
pub const CATEGORIES: [&str; 9] = [
    "",
    "Birthday",
    "Wedding Anniversary",
    "Anniversary",
    "Moto",
    "Holiday",
    "Appointment",
    "One Off Event",
    "Other",
];

/// Notes text carried by the sentinel record for a missing key.
pub const RECORD_NOT_FOUND: &str = "Record not found";

/// The escalating notification thresholds, in firing priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Now,
    Stage3,
    Stage2,
    Stage1,
}

impl Stage {
    /// Display label used in notifications and logs.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Now => "Now",
            Stage::Stage3 => "Stage 3",
            Stage::Stage2 => "Stage 2",
            Stage::Stage1 => "Stage 1",
        }
    }
}

/// A named event with a due date/time and staged notification latches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique key, also the first serialized field.
    pub name: String,
    /// "D Month YYYY"; may carry the original anniversary year.
    pub date_due: String,
    /// "HH:MM", 24-hour.
    pub time_due: String,
    pub category: String,
    /// Stored but otherwise unused.
    pub recurring: String,
    pub notes: String,
    /// Last-computed countdown text, recomputed every sweep and persisted
    /// for display continuity only.
    pub remaining: String,
    pub stage1_fired: bool,
    pub stage2_fired: bool,
    pub stage3_fired: bool,
    pub now_fired: bool,
    /// Due year seen by the previous sweep, used to detect annual rollover.
    #[serde(skip)]
    pub last_due_year: Option<i32>,
}

impl Event {
    /// The sentinel returned when a lookup misses: every field empty except
    /// the notes, which carry the error marker.
    pub fn not_found() -> Self {
        Self {
            notes: RECORD_NOT_FOUND.to_string(),
            ..Self::default()
        }
    }

    /// Re-arm all four notification latches for the next occurrence.
    pub fn reset_stages(&mut self) {
        self.stage1_fired = false;
        self.stage2_fired = false;
        self.stage3_fired = false;
        self.now_fired = false;
    }

    /// Whether the latch for `stage` has already fired.
    pub fn stage_fired(&self, stage: Stage) -> bool {
        match stage {
            Stage::Now => self.now_fired,
            Stage::Stage3 => self.stage3_fired,
            Stage::Stage2 => self.stage2_fired,
            Stage::Stage1 => self.stage1_fired,
        }
    }

    /// Latch the given stage. Latches only ever move towards fired.
    pub fn set_stage_fired(&mut self, stage: Stage) {
        match stage {
            Stage::Now => self.now_fired = true,
            Stage::Stage3 => self.stage3_fired = true,
            Stage::Stage2 => self.stage2_fired = true,
            Stage::Stage1 => self.stage1_fired = true,
        }
    }

    /// The full eleven-field row for persistence, in serialized order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.date_due.clone(),
            self.time_due.clone(),
            self.category.clone(),
            self.recurring.clone(),
            self.notes.clone(),
            self.remaining.clone(),
            bool_field(self.stage1_fired),
            bool_field(self.stage2_fired),
            bool_field(self.stage3_fired),
            bool_field(self.now_fired),
        ]
    }

    /// Build an event from a stored row. A row holding only the seven
    /// display fields loads with every latch not yet fired.
    pub fn from_row(fields: &[String]) -> Result<Self> {
        if fields.len() < 7 {
            return Err(AppError::MalformedRecord(format!(
                "expected at least 7 fields, got {}",
                fields.len()
            )));
        }

        let flag = |index: usize| fields.get(index).map(|f| f == "True").unwrap_or(false);

        Ok(Self {
            name: fields[0].clone(),
            date_due: fields[1].clone(),
            time_due: fields[2].clone(),
            category: fields[3].clone(),
            recurring: fields[4].clone(),
            notes: fields[5].clone(),
            remaining: fields[6].clone(),
            stage1_fired: flag(7),
            stage2_fired: flag(8),
            stage3_fired: flag(9),
            now_fired: flag(10),
            last_due_year: None,
        })
    }

    /// The seven display fields in header order. Stage latches are never
    /// exposed here.
    pub fn display_row(&self) -> [String; 7] {
        [
            self.name.clone(),
            self.date_due.clone(),
            self.time_due.clone(),
            self.category.clone(),
            self.recurring.clone(),
            self.notes.clone(),
            self.remaining.clone(),
        ]
    }
}

fn bool_field(value: bool) -> String {
    let text = if value { "True" } else { "False" };
    text.to_string()
}
