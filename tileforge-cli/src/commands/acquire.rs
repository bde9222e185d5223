//! Acquisition commands: `search`, `order` and `get-imagery`.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::CliError;
use crate::runner::CliRunner;
use tileforge::pipeline::{
    run_order_phase, run_search_phase, OrderPhaseOutput, PipelineContext, SearchPhaseOutput,
};
use tileforge::provider::AsyncReqwestClient;
use tileforge::storage::LocalStore;

/// Arguments of the `order` command.
pub struct OrderArgs {
    pub manifest: PathBuf,
    pub resume: Option<PathBuf>,
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

async fn search(
    runner: &CliRunner,
    store: &LocalStore,
    client: &AsyncReqwestClient,
    targets: &Path,
) -> Result<SearchPhaseOutput, CliError> {
    let config = runner.config();
    let ctx = PipelineContext::new(store, client, &config.api, runner.dirs().data_path());
    let output = run_search_phase(
        &ctx,
        &path_str(targets),
        config.interval.clone(),
        config.search.clone(),
        config.order.max_order_size,
    )
    .await?;
    println!(
        "Found {} scenes in {} orders: {}",
        output.scenes, output.orders, output.manifest_path
    );
    Ok(output)
}

async fn order(
    runner: &CliRunner,
    store: &LocalStore,
    client: &AsyncReqwestClient,
    manifest: &str,
    resume: Option<&str>,
) -> Result<OrderPhaseOutput, CliError> {
    let config = runner.config();
    let ctx = PipelineContext::new(store, client, &config.api, runner.dirs().data_path());
    let output = run_order_phase(&ctx, manifest, config.order.clone(), resume).await?;
    println!(
        "Submitted {} orders ({} already recorded): {}",
        output.submitted, output.skipped, output.manifest_path
    );
    Ok(output)
}

/// Runs the search phase over `targets` (or `[storage] targets_dir`).
pub fn run_search(runner: &CliRunner, targets: Option<PathBuf>) -> Result<(), CliError> {
    runner.log_startup("search");
    let targets = targets.unwrap_or_else(|| runner.config().storage.targets_dir.clone());
    let client = runner.http_client()?;
    let store = LocalStore::new();

    runner
        .runtime()?
        .block_on(search(runner, &store, &client, &targets))?;
    Ok(())
}

/// Submits the orders of an existing order manifest.
pub fn run_order(runner: &CliRunner, args: OrderArgs) -> Result<(), CliError> {
    runner.log_startup("order");
    let client = runner.http_client()?;
    let store = LocalStore::new();
    let manifest = path_str(&args.manifest);
    let resume = args.resume.as_deref().map(path_str);

    runner
        .runtime()?
        .block_on(order(runner, &store, &client, &manifest, resume.as_deref()))?;
    Ok(())
}

/// Searches then immediately orders what was found.
pub fn run_get_imagery(runner: &CliRunner, targets: Option<PathBuf>) -> Result<(), CliError> {
    runner.log_startup("get-imagery");
    let targets = targets.unwrap_or_else(|| runner.config().storage.targets_dir.clone());
    let client = runner.http_client()?;
    let store = LocalStore::new();

    runner.runtime()?.block_on(async {
        let found = search(runner, &store, &client, &targets).await?;
        if found.orders == 0 {
            info!("Nothing to order");
        }
        order(runner, &store, &client, &found.manifest_path, None).await
    })?;
    Ok(())
}
