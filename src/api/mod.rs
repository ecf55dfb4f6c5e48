pub(crate) mod analytics;
pub(crate) mod auth;
pub(crate) mod catalog;
pub(crate) mod downloads;
pub(crate) mod errors;
pub(crate) mod exams;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod organizations;
pub(crate) mod pagination;
pub(crate) mod questions;
pub(crate) mod results;
pub(crate) mod router;
pub(crate) mod students;
pub(crate) mod users;
pub(crate) mod validation;
