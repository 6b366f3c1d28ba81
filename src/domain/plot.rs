// ==========================================
// Site Progress - plot entity
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// Plot - a residential building plot
// ==========================================
// start_date is the plot-level construction start the timeline engine
// anchors the first stage's programme window to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plot {
    pub plot_id: String,              // plot ID
    pub name: String,                 // plot name/number as shown on the site map
    pub construction_type_id: String, // catalog reference (stage sequence source)
    pub start_date: NaiveDate,        // plot-level construction start
}
