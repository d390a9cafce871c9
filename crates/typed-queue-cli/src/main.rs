use clap::Parser;
use typed_queue_cli::{run_cli, Cli};

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version requests are not errors
            let exit_code = if e.use_stderr() { 3 } else { 0 };
            let _ = e.print();
            std::process::exit(exit_code);
        }
    };

    // Run CLI and exit with a code matching the error type
    if let Err(e) = run_cli(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}
