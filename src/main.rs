// src/main.rs

use tisf_run::{cli, logging, run};
use tracing::error;

#[tokio::main]
async fn main() {
    let args = cli::parse();

    if args.config.is_none() {
        for line in cli::USAGE_LINES {
            println!("{line}");
        }
        std::process::exit(1);
    }

    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("tisf-run error: {err:?}");
        std::process::exit(1);
    }

    if let Err(err) = run(args).await {
        error!(error = %err, "run failed; workspace left in place");
        eprintln!("tisf-run error: {err}");
        std::process::exit(err.exit_code());
    }
}
