/// Calcflow CLI
///
/// Evaluates arithmetic expressions with simulated per-operator costs, either
/// one-shot (`eval`) or through an interactive `session` on stdin.
use calcflow_core::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
