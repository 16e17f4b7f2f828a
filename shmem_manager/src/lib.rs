//! shmem Manager Library
//!
//! Command implementations behind the `shmem` binary. Each command returns
//! plain data so it can be driven from tests as well as the CLI.

pub mod commands;
