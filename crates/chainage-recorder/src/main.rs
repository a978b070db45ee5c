use chainage_recorder::{Settings, logging};
use std::process::ExitCode;

fn main() -> ExitCode {
    let settings = Settings::from_cli();
    logging::setup_logging();
    logging::log_version_info();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    match rt.block_on(chainage_recorder::run(settings)) {
        Ok(summary) => {
            tracing::info!(
                samples = summary.samples,
                ticks_without_fix = summary.ticks_without_fix,
                off_route = summary.off_route,
                write_errors = summary.write_errors,
                "Done"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "Recording failed");
            ExitCode::FAILURE
        }
    }
}
