use clap::Parser;
use env_logger::Env;
use log::{debug, LevelFilter};
use snafu::ErrorCompat;

mod args;
mod scn;

fn main() {
    let args = args::Args::parse();

    let mut logger = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if args.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();
    debug!("args: {:?}", args);

    let res = scn::run_scenario(&args);

    if let Err(e) = res {
        eprintln!("An error occurred {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
