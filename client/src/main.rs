use clap::Parser;
use client::QuizClient;
use log::info;
use shared::Response;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:65432")]
    server: String,

    /// Player name to register as
    #[arg(short, long)]
    name: String,

    /// Create a room for this many players (1 or 2)
    #[arg(short, long)]
    create: Option<usize>,

    /// Join an existing room by id
    #[arg(short, long)]
    join: Option<String>,

    /// Questions per game when creating a room
    #[arg(short, long, default_value = "5")]
    questions: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    if args.create.is_some() && args.join.is_some() {
        return Err("pass either --create or --join, not both".into());
    }

    info!("Connecting to {}", args.server);
    let mut quiz = QuizClient::connect(&args.server).await?;

    match quiz.register(&args.name).await? {
        Response::Ok { message, .. } => {
            println!("{}", message.unwrap_or_default());
        }
        Response::Error { message } => return Err(message.into()),
        other => return Err(format!("unexpected reply: {:?}", other).into()),
    }

    let reply = if let Some(mode) = args.create {
        quiz.create_room(mode, args.questions).await?
    } else if let Some(room_id) = args.join.as_deref() {
        quiz.join_room(room_id).await?
    } else {
        // No room to play: just show the global standings.
        println!("--- Global rankings ---");
        let rankings = quiz.list_rankings().await?;
        if rankings.is_empty() {
            println!("No rankings available yet.");
        }
        for (position, (player, score)) in rankings.iter().enumerate() {
            println!("{}. {}: {} points", position + 1, player, score);
        }
        return Ok(());
    };

    let room_id = match reply {
        Response::Ok {
            message,
            room_id: Some(room_id),
            ..
        } => {
            if let Some(message) = message {
                println!("{}", message);
            }
            room_id
        }
        Response::Error { message } => return Err(message.into()),
        other => return Err(format!("unexpected reply: {:?}", other).into()),
    };

    let (mut events, mut requests) = quiz.into_split();

    // Stdin lines become answer submissions while the event loop below
    // keeps printing pushes.
    {
        let room_id = room_id.clone();
        tokio::spawn(async move {
            let mut input = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = input.next_line().await {
                let answer = line.trim().to_string();
                if answer.is_empty() {
                    continue;
                }
                if requests.submit_answer(&room_id, &answer).await.is_err() {
                    break;
                }
            }
        });
    }

    loop {
        match events.next_event().await? {
            Response::Question {
                question,
                round_index,
                round_total,
            } => {
                println!();
                println!("--- Round {}/{} ---", round_index, round_total);
                println!("Question: {}", question.text);
                for (number, option) in question.options.iter().enumerate() {
                    println!("{}. {}", number + 1, option);
                }
                println!("Your answer (number):");
            }
            Response::Correct {
                player,
                points,
                scoreboard,
            } => {
                println!();
                println!("Correct! {} wins {} points.", player, points);
                println!("Scoreboard: {:?}", scoreboard);
            }
            Response::Timeout => {
                println!();
                println!("Time's up for this question!");
            }
            Response::GameOver {
                final_scoreboard,
                winner,
                winner_score,
            } => {
                println!();
                println!("--- Game over! ---");
                println!("Final scoreboard: {:?}", final_scoreboard);
                println!("The winner is {} with {} points.", winner, winner_score);
                break;
            }
            Response::Error { message } => {
                println!("Server error: {}", message);
                break;
            }
            other => {
                info!("Ignoring message: {:?}", other);
            }
        }
    }

    // The stdin reader keeps the runtime alive until its blocked read
    // returns, so leave the process explicitly.
    std::process::exit(0);
}
