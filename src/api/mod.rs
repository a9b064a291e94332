pub(crate) mod analytics;
pub(crate) mod assessments;
pub(crate) mod auth;
pub(crate) mod errors;
pub(crate) mod extract;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod realtime;
pub(crate) mod router;
pub(crate) mod student;
pub(crate) mod users;
