pub mod bus;
pub mod rooms;
pub mod types;
