pub mod acquisition;
pub mod config;
pub mod database;
pub mod error;
pub mod sensors;

use chrono::prelude::*;

pub use error::{Error, Result};

pub type Timestamp = DateTime<Utc>;
