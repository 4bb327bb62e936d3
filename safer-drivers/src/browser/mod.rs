pub mod driver;
pub mod error;
pub mod launch;
pub mod page;
pub mod session;
