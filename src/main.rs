use clap::Parser;

use nessus_export::cli::Cli;
use nessus_export::logging::init_logging;
use nessus_export::progress::{ProgressRenderer, render_summary};
use nessus_export::{Error, Exporter, cancel_on_signal};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    let quiet = cli.quiet;

    let exporter = match Exporter::new(cli.into_config()) {
        Ok(exporter) => exporter,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    let renderer = tokio::spawn(ProgressRenderer::new(quiet).run(exporter.subscribe()));
    let signals = cancel_on_signal(&exporter);

    let result = exporter.run().await;

    // Closing the channel lets the renderer drain and exit
    drop(exporter);
    renderer.await.ok();
    signals.abort();

    let code = match result {
        Ok(summary) => {
            if summary.cancelled {
                eprintln!("\nProcess interrupted by user. Exiting...");
            }
            if !quiet || !summary.failed.is_empty() {
                println!("{}", render_summary(&summary));
            }
            0
        }
        Err(Error::Cancelled) => {
            eprintln!("\nProcess interrupted by user. Exiting...");
            0
        }
        Err(e) => {
            tracing::error!(error = %e, "Export run failed");
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}
