//! Concurrent fan-out of independent lookups
//!
//! [`fetch`] runs one operation under a sub-timeout and reports through a
//! pair of channels and a [`WaitGroup`]. [`FetchGroup`] is the orchestrating
//! side: it sizes the wait group, owns the error channel and drains it with
//! an explicit [`DrainPolicy`].

pub mod fetcher;
pub mod group;
pub mod wait_group;

pub use fetcher::{fetch, FetchOperation};
pub use group::{DrainPolicy, FetchGroup, Slot};
pub use wait_group::{WaitGroup, WaitGroupGuard};
