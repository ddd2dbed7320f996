pub mod logger;
pub mod logging;
pub mod math;

pub use logging::{read_log_tail, truncate_text};
