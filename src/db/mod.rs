//! Preference storage backends (Firestore, in-memory).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

/// Collection names as constants.
pub mod collections {
    /// Favourite weekdays (keyed by user ID)
    pub const FAV_WEEKDAYS: &str = "fav_weekdays";
}
