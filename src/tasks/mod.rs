//! Background loops
//!
//! Two independent timer loops run next to the server: the
//! [`ScrapeScheduler`] feeding the playlist store and the [`PushTicker`]
//! feeding the broadcast registry. Both catch every per-cycle failure and
//! keep running; both stop when the shutdown watch flips.

pub mod scheduler;
pub mod ticker;

pub use scheduler::{scrape_once, ScrapeScheduler};
pub use ticker::{should_send_song, PushTicker};
