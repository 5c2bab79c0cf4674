pub mod contact;
pub mod map;
