pub(crate) mod assessments;
pub(crate) mod attempts;
pub(crate) mod health;
pub(crate) mod users;
