pub mod countdown;
pub mod mint;
pub mod status;
