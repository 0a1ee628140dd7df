//! Link Validation Module
//!
//! This module authorizes access to the form from signed distribution links.
//! A link carries an organization name, an expiry timestamp and an HMAC-SHA256
//! signature over both; links without any parameters open the form in
//! unauthenticated mode under the default organization.

mod validator;


pub use validator::{LinkValidator, signed_query};
