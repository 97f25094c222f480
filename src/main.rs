// src/main.rs

use relive::{cli, config, errors::Result, logging, print_dry_run, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        if err.is_fatal() {
            eprintln!("{}", cli::usage());
        }
        eprintln!("relive error: {err}");
        std::process::exit(1);
    }
}

async fn run_main() -> Result<()> {
    let args = cli::parse();
    let cfg = config::load_and_resolve(&args)?;
    logging::init_logging(args.log_level, cfg.verbose)?;

    if args.dry_run {
        return print_dry_run(&cfg);
    }
    run(cfg).await
}
