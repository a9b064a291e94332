use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::schemas::trimmed_email;

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) role: UserRole,
    pub(crate) department: Option<String>,
    pub(crate) profile_picture_url: Option<String>,
    pub(crate) created_at: String,
}

impl UserResponse {
    pub(crate) fn from_db(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            department: user.department,
            profile_picture_url: user.profile_picture_url,
            created_at: format_primitive(user.created_at),
        }
    }
}

/// Partial profile update. Absent or blank fields keep their current value.
#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct ProfileUpdate {
    #[serde(default)]
    pub(crate) username: Option<String>,
    #[serde(default)]
    #[validate(custom(function = trimmed_email, message = "email must be a valid address"))]
    pub(crate) email: Option<String>,
    #[serde(default)]
    pub(crate) department: Option<String>,
    #[serde(default, alias = "profilePictureUrl")]
    #[validate(url(message = "profile_picture_url must be a valid URL"))]
    pub(crate) profile_picture_url: Option<String>,
}

impl ProfileUpdate {
    pub(crate) fn username(&self) -> Option<&str> {
        present(&self.username)
    }

    pub(crate) fn email(&self) -> Option<&str> {
        present(&self.email)
    }

    pub(crate) fn department(&self) -> Option<&str> {
        present(&self.department)
    }

    pub(crate) fn profile_picture_url(&self) -> Option<&str> {
        present(&self.profile_picture_url)
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}
