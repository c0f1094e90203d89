//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module          | Commands handled                                   |
//! |-----------------|-----------------------------------------------------|
//! | `serve`         | `Serve`                                            |
//! | `config`        | `Config`                                           |
//! | `maintenance`   | `Icons`, `Counts`                                  |

pub mod config;
pub mod maintenance;
pub mod serve;

pub use config::cmd_config;
pub use maintenance::{cmd_counts, cmd_icons};
pub use serve::cmd_serve;
