pub mod appointment;
pub mod doctor;
pub mod enums;
pub mod medical_record;
pub mod user;

pub use appointment::*;
pub use doctor::*;
pub use enums::*;
pub use medical_record::*;
pub use user::*;
