pub mod detect;
pub mod error;
pub mod fs;
pub mod git;
pub mod lifecycle;
pub mod parser;
pub mod project;
pub mod registry;
pub mod report;
pub mod state;
pub mod status;
pub mod workflow;

/// ASCII art logo for the cadence CLI
pub const LOGO: &str = "\
  ┌─┐┌─┐┌┬┐┌─┐┌┐┌┌─┐┌─┐
  │  ├─┤ ││├┤ ││││  ├┤
  └─┘┴ ┴─┴┘└─┘┘└┘└─┘└─┘";
