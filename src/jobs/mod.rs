pub mod appointment_expiry;
