//! Driver layer for browser automation.
//!
//! This crate owns the rendering session used by a carrier lookup: one
//! WebDriver-backed browser per lookup, acquired and released through the
//! [`browser::session::SessionLauncher`] / [`browser::session::RenderingSession`]
//! seam so the lookup logic can run against any implementation.
//!
//! - [`browser::driver::WebDriverLauncher`]: connects to a WebDriver endpoint
//! - [`browser::page::WebDriverSession`]: navigation, waits, and DOM queries
//! - [`browser::session::SessionGuard`]: scoped ownership with guaranteed release
//! - [`browser::launch`]: Chrome arguments and capabilities
pub mod browser;
