//! Carrier snapshot lookup against the FMCSA SAFER registry.
//!
//! - [`lookup::CarrierScraper`]: drives one browser session per lookup
//! - [`labels`]: label-to-value matching over rendered tables
//! - [`extract`]: field mapping from labels to a [`record::CarrierRecord`]
//!
//! ```no_run
//! use safer_lookup::CarrierScraper;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), safer_lookup::LookupError> {
//! let scraper = CarrierScraper::new(10);
//! if let Some(record) = scraper.extract_carrier_data("720604").await? {
//!     println!("{:?}", record.company_name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod extract;
pub mod labels;
pub mod lookup;
pub mod record;

pub use error::LookupError;
pub use lookup::{Absence, CarrierScraper, LookupOutcome};
pub use record::CarrierRecord;
