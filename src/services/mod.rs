pub mod bookings;
pub mod events;
pub mod slots;
pub mod spots;
pub mod stats;
pub mod users;
