//! Entity types exchanged with the OFleet API
//!
//! The remote schema is owned by the server. Entities are kept as opaque JSON
//! and only the few fields the client derives values from are ever read.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Vehicle as returned by `/vehicles/*`
pub type Vehicle = Value;

/// Booking (rental contract) as returned by `/contracts/*`
pub type Booking = Value;

/// Customer record as returned by `/clients/*`
pub type Client = Value;

/// Rental agency
pub type Agency = Value;

/// Pickup/drop-off location
pub type Location = Value;

/// Country entry
pub type Country = Value;

/// A file attached to a multipart request
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    /// File name announced in the multipart part
    pub file_name: String,
    /// Raw file content
    pub content: Vec<u8>,
}

impl DocumentUpload {
    /// Wrap file bytes with the name sent in the multipart part
    #[must_use]
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self { file_name: file_name.into(), content: content.into() }
    }

    /// Size in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.content.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl fmt::Debug for DocumentUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentUpload")
            .field("file_name", &self.file_name)
            .field("size", &self.content.len())
            .finish()
    }
}

/// Parameters for moving a booking to another vehicle or period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingVehicleChange {
    /// Booking being moved
    pub booking_id: String,
    /// Vehicle the booking moves to
    pub vehicle_id: String,
    /// Start of the new period
    pub from_date: String,
    /// End of the new period
    pub to_date: String,
    /// Delivery fee charged on the new contract
    pub delivery_fee: f64,
    /// Drop-off fee charged on the new contract
    pub dropoff_fee: f64,
    /// Persist the change (`true`) or only price it (`false`)
    pub save: bool,
}

/// One group produced by [`crate::utils::grouping::count_by_property`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyCount {
    /// Property value shared by the group
    pub key: String,
    /// Number of entities in the group
    pub count: usize,
}
