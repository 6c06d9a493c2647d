use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::date::parse_due_date;

#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

/// A single to-do entry. An `id` of `0` means "not stored yet"; the store
/// assigns the real id on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub priority: Priority,
    pub due_date: String, // "DD.MM.YYYY"
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub notes: String,
}

impl Task {
    pub fn new(title: impl Into<String>, due_date: impl Into<String>) -> Self {
        Self {
            id: 0,
            title: title.into(),
            is_completed: false,
            priority: Priority::Low,
            due_date: due_date.into(),
            category: String::new(),
            notes: String::new(),
        }
    }

    pub fn due(&self) -> Option<NaiveDate> {
        parse_due_date(&self.due_date)
    }

    pub fn is_overdue_on(&self, today: NaiveDate) -> bool {
        !self.is_completed && self.due().is_some_and(|due| due < today)
    }

    pub fn is_overdue(&self) -> bool {
        self.is_overdue_on(Local::now().date_naive())
    }

    /// Copy of this task with the completion flag flipped.
    pub fn toggled(&self) -> Self {
        Self {
            is_completed: !self.is_completed,
            ..self.clone()
        }
    }
}
