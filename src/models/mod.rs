pub mod user;
pub mod bike;
pub mod appointment;
pub mod review;

pub use user::*;
pub use bike::*;
pub use appointment::*;
pub use review::*;
