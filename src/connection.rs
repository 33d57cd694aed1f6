//! The seam between the lobby and whatever carries its lines. The lobby
//! never sees transport types; it only hands finished protocol lines to a
//! `Connection` and may ask for the connection to be torn down.

use crate::error::DeliveryError;

pub trait Connection: Send {
    /// Queue one protocol line for delivery. Must not block.
    fn deliver(&mut self, line: &str) -> Result<(), DeliveryError>;

    /// Tear the connection down. Delivery attempts after this fail with
    /// `DeliveryError::Closed`.
    fn close(&mut self);
}
