use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    #[serde(alias = "student")]
    Student,
    #[serde(alias = "teacher")]
    Teacher,
}

impl UserRole {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Student => "STUDENT",
            Self::Teacher => "TEACHER",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_accepts_either_case_and_serializes_upper() {
        let upper: UserRole = serde_json::from_str("\"TEACHER\"").expect("upper");
        let lower: UserRole = serde_json::from_str("\"student\"").expect("lower");

        assert_eq!(upper, UserRole::Teacher);
        assert_eq!(lower, UserRole::Student);
        assert_eq!(serde_json::to_string(&UserRole::Student).unwrap(), "\"STUDENT\"");
    }
}
