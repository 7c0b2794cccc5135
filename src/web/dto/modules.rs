use serde::Deserialize;
use uuid::Uuid;

use crate::model::entity::ModuleKind;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ModuleCreateBody {
    pub course_id: Uuid,
    pub title: String,
    /// Appended after the last module when omitted.
    pub order_index: Option<i32>,
    pub kind: ModuleKind,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ModulePatchBody {
    pub title: Option<String>,
    pub order_index: Option<i32>,
}
