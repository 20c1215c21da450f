use clap::Parser;
use log::info;
use server::game::GameTiming;
use server::network::Server;
use server::questions::QuestionBank;
use server::rankings::RankingStore;
use std::path::PathBuf;

/// Main-method of the application.
/// Parses command-line arguments, loads the question bank and the ranking
/// table, then runs the accept loop forever.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value = "65432")]
        port: u16,
        /// Path of the persisted rankings table
        #[clap(short, long, default_value = "rankings.json")]
        rankings_file: PathBuf,
        /// Optional JSON file with a custom question bank
        #[clap(short, long)]
        questions_file: Option<PathBuf>,
    }

    env_logger::init();
    let args = Args::parse();

    let bank = match &args.questions_file {
        Some(path) => QuestionBank::from_file(path)?,
        None => QuestionBank::builtin(),
    };
    info!("Question bank holds {} questions", bank.len());

    // Rankings must be in memory before the first connection is accepted.
    let rankings = RankingStore::load(&args.rankings_file);

    let address = format!("{}:{}", args.host, args.port);
    let server = Server::new(&address, bank, rankings, GameTiming::default()).await?;
    server.run().await?;

    Ok(())
}
