mod args;
mod tracker;

use clap::Parser;
use log::{debug, warn};

use crate::args::Args;

fn main() {
    let args = Args::parse();

    if args.verbose {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }
    debug!("args: {:?}", args);

    if let Err(e) = tracker::run(&args) {
        warn!("Error occured {:?}", e);
        tracker::report_error(&e);
        std::process::exit(1);
    }
}
