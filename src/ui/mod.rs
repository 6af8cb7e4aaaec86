//! Terminal output helpers
//!
//! Styled output and spinners when attached to a terminal, plain text
//! otherwise (pipes, CI, cron).

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{key_value, key_value_status, map_status, section, step_error, step_ok, step_warn};
pub use progress::TaskSpinner;
