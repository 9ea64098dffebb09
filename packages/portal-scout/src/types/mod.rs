//! Domain types shared by the login flow, scrapers, and reports.

pub mod credentials;
pub mod profile;
pub mod record;
