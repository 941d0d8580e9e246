pub mod assignment;
pub mod contracts;
pub mod roster;
