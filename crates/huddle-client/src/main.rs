use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

use huddle_client::commands::{Command, HELP, parse_input};
use huddle_client::connection::{self, DEFAULT_PORT};
use huddle_client::display::render;
use huddle_client::error::ClientError;
use huddle_core::player::is_valid_display_name;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Player name (prompted for when omitted)
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Server host to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1")]
    server: String,

    /// Server port
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

type InputLines = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> ExitCode {
    // Quiet by default so logs don't interleave with the chat
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let raw_name = match args.name {
        Some(name) => name,
        None => match prompt_name(&mut lines).await {
            Ok(name) => name,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            },
        },
    };
    // Typed names lose stray whitespace; the server keeps whatever it is sent
    let name = raw_name.trim().to_string();
    if !is_valid_display_name(&name, None) {
        eprintln!("Player name cannot be empty!");
        return ExitCode::FAILURE;
    }

    let url = connection::server_url(&args.server, args.port);
    match run(&url, &name, &mut lines).await {
        Ok(()) => {
            println!("Thanks for playing!");
            ExitCode::SUCCESS
        },
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        },
    }
}

async fn prompt_name(lines: &mut InputLines) -> Result<String, ClientError> {
    print!("Enter your player name: ");
    let _ = std::io::stdout().flush();
    let line = lines.next_line().await.map_err(ClientError::Stdin)?;
    Ok(line.unwrap_or_default())
}

async fn run(url: &str, name: &str, lines: &mut InputLines) -> Result<(), ClientError> {
    let stream = connection::connect(url, name).await?;
    let (mut sink, mut stream) = stream.split();

    println!("Connected to {url} as '{name}'");
    println!("Type to chat. {HELP}");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.map_err(ClientError::Stdin)? else {
                    break;
                };
                match parse_input(&line) {
                    Command::Quit => break,
                    Command::Help => println!("{HELP}"),
                    Command::Empty => {},
                    command => {
                        if let Some(msg) = command.into_message() {
                            connection::send(&mut sink, &msg).await?;
                        }
                    },
                }
            }
            frame = stream.next() => {
                let frame = match frame {
                    Some(Ok(frame)) => frame,
                    Some(Err(e)) => return Err(ClientError::Receive(e)),
                    None => {
                        println!("Disconnected from server");
                        return Ok(());
                    },
                };
                match connection::decode_frame(&frame) {
                    Some(Ok(msg)) => {
                        if let Some(text) = render(&msg, name) {
                            println!("{text}");
                        }
                    },
                    Some(Err(e)) => tracing::warn!(error = %e, "Ignoring bad server message"),
                    None => {},
                }
            }
        }
    }

    let _ = sink.close().await;
    Ok(())
}
