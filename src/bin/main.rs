use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "moviedex-server")]
#[command(about = "REST API over a movie catalog", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "moviedex.yaml")]
    config: String,
    /// Log at debug level
    #[arg(short, long)]
    debug: bool,
    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    moviedex_rs::init_logging(args.debug, args.json_logs);

    if let Err(e) = moviedex_rs::run(&args.config, args.debug).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
