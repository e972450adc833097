//! Loading include tables from TOML.
//!
//! ```toml
//! [meta]
//! name = "extra-arm-includes"
//!
//! [profiles.ARM."ARMDisassembler.cpp"]
//! text = '''
//! #include "../../MCInst.h"
//! '''
//! ```

pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, load_table, ConfigError};
pub use schema::{FileEntry, Metadata, TableConfig, ValidationError, ValidationIssue};
