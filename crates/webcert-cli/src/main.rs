pub(crate) mod cli;
pub(crate) mod error;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = cli::Cli::new();

    if let Err(e) = cli.execute().await {
        if cli.logs_to_file() {
            log::error!("{}: {e}", e.kind());
        }
        eprintln!("{}: {e}", e.kind());
        std::process::exit(1);
    }
}
