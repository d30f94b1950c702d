//! Inbound command handling

pub mod parser;
pub mod router;

pub use parser::{Command, parse_command};
pub use router::{Dispatch, MemberStats, Router, RouterSettings};
