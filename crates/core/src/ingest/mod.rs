pub mod normalize;
pub mod provider;
pub mod types;

pub use normalize::{normalize, normalize_and_filter, Normalized};
pub use provider::{ListingProvider, ScrapeakClient};
pub use types::{AddressQuery, RawListingsResponse};
