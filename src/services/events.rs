use rusqlite::Connection;
use tokio::sync::broadcast;

use crate::db::queries;
use crate::models::{Booking, ChangeEvent};

pub const EVENT_CHANNEL_CAPACITY: usize = 256;

pub fn publish(tx: &broadcast::Sender<ChangeEvent>, event: ChangeEvent) {
    tracing::debug!(event = event.name(), "publishing change event");
    // No subscribers is not an error
    let _ = tx.send(event);
}

/// Publishes a booking change and, when its spot's counter moved, the spot
/// as it reads after the commit.
pub fn publish_booking_change(
    conn: &Connection,
    tx: &broadcast::Sender<ChangeEvent>,
    booking: &Booking,
    spot_touched: bool,
) {
    if spot_touched {
        match queries::get_spot(conn, &booking.parking_spot_id) {
            Ok(Some(spot)) => publish(tx, ChangeEvent::SpotChanged { spot }),
            Ok(None) => {}
            Err(e) => tracing::error!(error = %e, "failed to load spot for change event"),
        }
    }
    publish(
        tx,
        ChangeEvent::BookingChanged {
            booking: booking.clone(),
        },
    );
}
