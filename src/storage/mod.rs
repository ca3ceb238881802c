//! Object storage: addressing, listing, downloads and the site catalog.

pub mod catalog;
pub mod gcs;
pub mod listing;
pub mod mirror;
pub mod object;

pub use catalog::{Catalog, IndexPolicy, index_recordings};
pub use gcs::GcsClient;
pub use listing::{ListedItem, ListingPage, ObjectStore};
pub use mirror::Mirror;
pub use object::{ObjectRef, basename_of};
