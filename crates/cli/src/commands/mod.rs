//! Command handlers for the pia CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod convert;
pub mod list;
pub mod render;
pub mod show;
pub mod vars;

pub use convert::ConvertCommand;
pub use list::ListCommand;
pub use render::RenderCommand;
pub use show::ShowCommand;
pub use vars::VarsCommand;
