// ==========================================
// Site Progress - domain type definitions
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// StageStatus
// ==========================================
// Derived purely from planned window vs today; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    NotStarted, // planned_start >= today (start day itself counts as unobserved)
    InProgress, // planned_start < today < planned_end
    Complete,   // planned_end <= today
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::NotStarted => write!(f, "NOT_STARTED"),
            StageStatus::InProgress => write!(f, "IN_PROGRESS"),
            StageStatus::Complete => write!(f, "COMPLETE"),
        }
    }
}

// ==========================================
// PlotProfileKind
// ==========================================
// Demo seeding profiles: each plot in a seeded database gets one of
// these so the dashboard shows a realistic spread of build states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlotProfileKind {
    Completed, // nearly complete
    Active,    // in active construction
    Midway,    // halfway through
    Starting,  // just starting
    Upcoming,  // starting soon
    Delayed,   // running behind, replanned repeatedly
}

impl PlotProfileKind {
    /// Plot start offset from today, in days (negative = started in the past)
    pub fn start_offset_days(&self) -> i64 {
        match self {
            PlotProfileKind::Completed => -70,
            PlotProfileKind::Active => -45,
            PlotProfileKind::Midway => -30,
            PlotProfileKind::Starting => -10,
            PlotProfileKind::Upcoming => 5,
            PlotProfileKind::Delayed => -50,
        }
    }

    /// Stage duration multiplier (>1.0 means the build runs slow)
    pub fn speed(&self) -> f64 {
        match self {
            PlotProfileKind::Completed => 0.8,
            PlotProfileKind::Active => 1.0,
            PlotProfileKind::Midway => 1.1,
            PlotProfileKind::Starting => 1.0,
            PlotProfileKind::Upcoming => 1.0,
            PlotProfileKind::Delayed => 1.5,
        }
    }

    /// All profiles, in the rotation order used by the seeder
    pub fn all() -> [PlotProfileKind; 6] {
        [
            PlotProfileKind::Completed,
            PlotProfileKind::Active,
            PlotProfileKind::Midway,
            PlotProfileKind::Starting,
            PlotProfileKind::Upcoming,
            PlotProfileKind::Delayed,
        ]
    }
}

impl fmt::Display for PlotProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlotProfileKind::Completed => write!(f, "COMPLETED"),
            PlotProfileKind::Active => write!(f, "ACTIVE"),
            PlotProfileKind::Midway => write!(f, "MIDWAY"),
            PlotProfileKind::Starting => write!(f, "STARTING"),
            PlotProfileKind::Upcoming => write!(f, "UPCOMING"),
            PlotProfileKind::Delayed => write!(f, "DELAYED"),
        }
    }
}
