use clap::Parser;
use std::time::Duration;

use hello_pi::cli::WorkerArgs;
use hello_pi::logging;
use hello_pi::worker::Worker;

fn main() {
    let args = WorkerArgs::parse();
    logging::init_stderr(&args.common.log_level);

    Worker::new(args.common.store(), Duration::from_secs(args.interval_secs)).run()
}
