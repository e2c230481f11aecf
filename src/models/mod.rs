pub mod booking;
pub mod event;
pub mod spot;
pub mod stats;
pub mod user;

pub use booking::{Booking, BookingStatus, NewBooking};
pub use event::ChangeEvent;
pub use spot::{NewParkingSpot, ParkingSpot, SpotStatus, SpotUpdate};
pub use stats::{AdminStats, RevenueData};
pub use user::{NewUser, User, UserRole};
