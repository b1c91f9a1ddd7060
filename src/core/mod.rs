//! Domain logic and the services the HTTP layer talks to

pub mod error;
pub mod mailing;
pub mod schedule;
pub mod seed;
pub mod services;
pub mod statistics;
pub mod traits;

mod clock;
