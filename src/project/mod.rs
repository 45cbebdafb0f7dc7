//! Read-only inspection of Vivado project build state.
//!
//! Vivado records each run (`synth_1`, `impl_1`) under `<project>.runs/`
//! with begin/end marker files, a `runme.log` and the generated outputs.
//! [`build_status`] reads those files without starting Vivado, so it works
//! while a build is still running in another process.

mod status;

pub use status::{build_status, find_bitstream, run_status, BuildState, BuildStatus, RunStatus};
