use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const MACHINE_CODE_LEN: usize = 16;
pub const MACHINE_CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MachineCode {
    pub id: i64,
    pub code: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub created_by: Option<i64>,
    pub user_id: Option<i64>,
    pub binded_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of checking a code without binding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeStatus {
    NotFound,
    Disabled,
    AlreadyBound,
    Valid,
}

impl CodeStatus {
    pub fn of(code: Option<&MachineCode>) -> Self {
        match code {
            None => CodeStatus::NotFound,
            Some(c) if !c.is_active => CodeStatus::Disabled,
            Some(c) if c.user_id.is_some() => CodeStatus::AlreadyBound,
            Some(_) => CodeStatus::Valid,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            CodeStatus::NotFound => "Machine code does not exist",
            CodeStatus::Disabled => "Machine code is disabled",
            CodeStatus::AlreadyBound => "Machine code is already bound to a user",
            CodeStatus::Valid => "Machine code is valid",
        }
    }
}

/// True when `code` has the right length and only uses `0-9A-Z`.
pub fn is_well_formed(code: &str) -> bool {
    code.len() == MACHINE_CODE_LEN && code.bytes().all(|b| MACHINE_CODE_ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(is_active: bool, user_id: Option<i64>) -> MachineCode {
        let now = Utc::now();
        MachineCode {
            id: 1,
            code: "A1B2C3D4E5F6G7H8".into(),
            name: None,
            description: None,
            created_by: None,
            user_id,
            binded_at: None,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn status_checks_existence_then_active_then_binding() {
        assert_eq!(CodeStatus::of(None), CodeStatus::NotFound);
        assert_eq!(CodeStatus::of(Some(&code(false, Some(3)))), CodeStatus::Disabled);
        assert_eq!(CodeStatus::of(Some(&code(true, Some(3)))), CodeStatus::AlreadyBound);
        assert_eq!(CodeStatus::of(Some(&code(true, None))), CodeStatus::Valid);
    }

    #[test]
    fn well_formed_codes() {
        assert!(is_well_formed("A1B2C3D4E5F6G7H8"));
        assert!(!is_well_formed("a1b2c3d4e5f6g7h8"));
        assert!(!is_well_formed("A1B2C3D4E5F6G7H"));
        assert!(!is_well_formed("A1B2C3D4E5F6G7H8-"));
    }
}
