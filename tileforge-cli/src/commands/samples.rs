//! `prepare-samples` command.

use std::path::PathBuf;

use crate::error::CliError;
use crate::runner::CliRunner;
use tileforge::pipeline::run_sample_phase;
use tileforge::storage::LocalStore;

/// Arguments of the `prepare-samples` command.
pub struct SampleArgs {
    /// Order manifest naming the scenes to sample.
    pub manifest: PathBuf,
    /// Directory holding the delivered rasters.
    pub src_dir: PathBuf,
}

/// Cuts delivered scenes into tile samples inside the run's data directory.
pub fn run(runner: &CliRunner, args: SampleArgs) -> Result<(), CliError> {
    runner.log_startup("prepare-samples");
    let store = LocalStore::new();

    let output = run_sample_phase(
        &store,
        &store,
        &args.manifest.to_string_lossy(),
        &args.src_dir.to_string_lossy(),
        &runner.dirs().data_path(),
        &runner.config().samples,
    )?;

    println!(
        "Wrote {} samples ({} with empty masks): {}",
        output.samples, output.all_null, output.manifest_path
    );
    Ok(())
}
