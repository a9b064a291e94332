pub(crate) mod analytics;
pub(crate) mod class_review;
pub(crate) mod grading;
pub(crate) mod join_codes;
pub(crate) mod notifier;
pub(crate) mod ranking;
