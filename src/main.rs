use clap::Parser;

use bptree::DEFAULT_ORDER;
use bptree::shell;

/// Interactive B+ tree index
#[derive(Debug, Parser)]
#[command(name = "bptree", version, about)]
struct Args {
    /// Tree order: maximum children per internal node (>= 3)
    #[arg(short, long, default_value_t = DEFAULT_ORDER)]
    order: usize,

    /// Log structural changes (splits, borrows, merges)
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = shell::run(args.order) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
