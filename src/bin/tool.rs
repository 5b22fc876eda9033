use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "moviedex-tool")]
#[command(about = "Offline maintenance for the movie catalog", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "moviedex.yaml")]
    config: String,
    #[arg(short, long)]
    debug: bool,
    #[arg(long)]
    json_logs: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive genres_tokens from genres and index it
    MigrateGenres {
        #[arg(long)]
        batch_size: Option<u32>,
    },
    /// Load newline-delimited JSON movie documents
    Import {
        file: String,
        #[arg(long, default_value_t = 500)]
        batch_size: usize,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    moviedex_rs::init_logging(args.debug, args.json_logs);

    let result = match args.command {
        Command::MigrateGenres { batch_size } => {
            moviedex_rs::migrate_genres(&args.config, batch_size)
                .await
                .map(|report| println!("Modified docs: {}", report.modified_count))
        }
        Command::Import { file, batch_size } => {
            moviedex_rs::import_file(&args.config, &file, batch_size)
                .await
                .map(|n| println!("Imported: {}", n))
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
