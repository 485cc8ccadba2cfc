// src/main.rs

use testherd::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("testherd error: {err:?}");
        std::process::exit(2);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    let exit_code = run(args).await?;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
