pub mod audit_log;
pub mod core;
pub mod http_countdown;
pub mod http_draw_feed;
pub mod mock;
pub mod observability;
pub mod persistence;

pub use audit_log::FileAuditLog;
pub use http_countdown::HttpCountdownSource;
pub use http_draw_feed::HttpDrawFeed;
pub use mock::{SimulatedClock, SimulatedCountdownSource, SimulatedDrawFeed};
