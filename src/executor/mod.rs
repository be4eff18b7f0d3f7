//! Command execution layer
//!
//! This module defines the command-runner capability used by the build
//! pipeline for container tooling (image build, push, removal) and for
//! installing runtime dependencies into a build root. The capability is a
//! trait so tests and alternative container-build backends can substitute
//! the shell.

mod shell;

pub use shell::{CommandRunner, RunOptions, RunOutput, ShellRunner};
