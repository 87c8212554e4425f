pub mod admin_service;
pub mod appointment_service;
pub mod auth_service;
pub mod review_service;
pub mod user_service;
pub mod workshop_service;

#[cfg(test)]
pub(crate) mod test_support;
