use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::Attr;
use crate::error::FieldErrors;

pub const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Deserialize)]
pub struct AttrPayload {
    pub name: Option<String>,
}

impl AttrPayload {
    /// The trimmed name, or the field errors explaining why it was refused.
    pub fn validate(self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::new();
        match self.name.map(|n| n.trim().to_string()) {
            None => errors.add("name", "This field is required."),
            Some(name) if name.is_empty() => errors.add("name", "This field may not be blank."),
            Some(name) if name.chars().count() > MAX_NAME_LEN => errors.add(
                "name",
                format!("Ensure this field has no more than {MAX_NAME_LEN} characters."),
            ),
            Some(name) => return Ok(name),
        }
        Err(errors)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrResponse {
    pub id: Uuid,
    pub name: String,
}

impl From<Attr> for AttrResponse {
    fn from(attr: Attr) -> Self {
        Self {
            id: attr.id,
            name: attr.name,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AttrListQuery {
    pub assigned_only: Option<String>,
}

impl AttrListQuery {
    pub fn assigned_only(&self) -> bool {
        matches!(self.assigned_only.as_deref(), Some("1" | "true" | "True"))
    }
}
