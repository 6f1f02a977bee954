pub mod coordinate;
pub mod photo;
pub mod round;
