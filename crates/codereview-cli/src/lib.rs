//! Code review CLI library.
//!
//! Subcommands run the review engine over the file-backed stores in a
//! state directory:
//!
//! ```text
//! state_dir/
//! ├── security.json
//! ├── repository/{project}/.polarion/codereview/codereview.properties
//! └── tracker/...
//! ```

pub mod cli;
pub mod commands;
pub mod error;

pub use error::CommandError;
