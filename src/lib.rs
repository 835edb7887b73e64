// Client-side core for the StayFinder rental marketplace.

pub mod cache;
pub mod client;
pub mod filters;
pub mod models;
pub mod pricing;
pub mod search;
pub mod session;
pub mod transport;

// Re-export key types for convenience
pub use cache::{CacheConfig, CacheStatsReport, SearchCache};
pub use client::{ClientStatsReport, StayfinderClient};
pub use filters::{FilterState, FilterUpdate};
pub use models::{Booking, BookingStatus, Listing, ListingPage, NewBooking, User};
pub use pricing::{compute_breakdown, nights_between, PriceBreakdown, PricingError};
pub use search::{AddressBar, MemoryAddressBar, SearchSession};
pub use session::{Session, SessionStore};
pub use transport::{ApiError, ClientConfig, HttpBackend, ReqwestBackend};
