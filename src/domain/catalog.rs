// ==========================================
// Site Progress - construction catalog entities
// ==========================================
// Immutable reference data: a construction type owns an ordered
// list of stages. Stages belong to the type, never to a plot.
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// ConstructionType
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionType {
    pub type_id: String, // construction type ID
    pub name: String,    // e.g. "Detached 3-bed", "Terrace block"
}

// ==========================================
// ConstructionStage
// ==========================================
// sort_order defines the strict build sequence within the owning type.
// color is display-only and carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionStage {
    pub stage_id: String,             // stage ID
    pub construction_type_id: String, // owning construction type
    pub name: String,                 // e.g. "Foundation", "Framing"
    pub sort_order: i32,              // strict ordering within the type
    pub color: String,                // display colour (hex)
}

impl ConstructionStage {
    /// Sort a stage list into build order (stable on sort_order)
    pub fn sort_into_build_order(stages: &mut [ConstructionStage]) {
        stages.sort_by_key(|s| s.sort_order);
    }
}
