use serde::{Deserialize, Serialize};

// ── Persist DTOs ────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct SavedResponse {
    pub ok: bool,
    pub id: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}
