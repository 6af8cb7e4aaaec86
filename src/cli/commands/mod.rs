//! CLI command implementations

pub mod config;
pub mod lookup;
pub mod status;
pub mod update;

pub use config::execute as config;
pub use lookup::execute as lookup;
pub use status::execute as status;
pub use update::execute as update;
