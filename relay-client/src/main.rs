use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use relay_client::{ Command, Feed, HttpUploader, command, prepare, render };
use relay_core::codec::{decode_line, encode_line};
use relay_core::config::DEFAULT_MAX_BATCH_FILES;
use relay_core::{ClientEvent, ServerEvent};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter, Lines, Stdin};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Terminal client for the relay group chat")]
struct Cli {
    /// Chat server address
    #[arg(short, long, default_value = "127.0.0.1:8075")]
    server: String,

    /// Upload gateway base URL
    #[arg(short, long, default_value = "http://127.0.0.1:8076")]
    uploads: String,

    /// Display name; asked for when missing
    #[arg(short, long)]
    name: Option<String>,

    #[arg(long, default_value_t = DEFAULT_MAX_BATCH_FILES)]
    max_files: usize,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn prompt_name(input: &mut Lines<BufReader<Stdin>>) -> Result<String> {
    let mut stdout = io::stdout();
    loop {
        stdout.write_all(b"Enter a display name: ").await?;
        stdout.flush().await?;
        let Some(line) = input.next_line().await? else {
            anyhow::bail!("stdin closed before a name was entered");
        };
        let name = line.trim();
        if !name.is_empty() {
            return Ok(name.to_string());
        }
    }
}

/// Prints the live feed until the server goes away.
async fn read_feed(reader: OwnedReadHalf) {
    let mut lines = BufReader::new(reader).lines();
    let mut feed = Feed::new();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let event = match decode_line::<ServerEvent>(&line) {
                    Ok(event) => event,
                    Err(e) => {
                        debug!(error = %e, "skipping unreadable line");
                        continue;
                    }
                };
                let is_backlog = matches!(event, ServerEvent::Messages(_));
                let shown = feed.apply(event);
                if is_backlog && shown.is_empty() {
                    println!("{}", "No messages yet.".blue());
                }
                for message in shown {
                    println!("{}", render(message));
                }
            }
            Ok(None) => {
                println!("{}", "\nServer closed the connection.".blue());
                break;
            }
            Err(e) => {
                eprintln!("{}", format!("Error reading from server: {e}").red());
                break;
            }
        }
    }
}

async fn send(writer: &mut BufWriter<OwnedWriteHalf>, event: &ClientEvent) -> Result<()> {
    writer.write_all(encode_line(event)?.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut input = BufReader::new(io::stdin()).lines();
    let name = match cli.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => prompt_name(&mut input).await?,
    };

    println!("Connecting to {}...", cli.server);
    let stream = TcpStream::connect(&cli.server)
        .await
        .with_context(|| format!("Failed to connect to {}", cli.server))?;
    println!("{}", format!("Connected as {name}").blue());

    let (reader, writer) = stream.into_split();
    let mut writer = BufWriter::new(writer);
    let mut feed_task = tokio::spawn(read_feed(reader));
    let uploader = HttpUploader::new(cli.uploads);

    println!(
        "{}",
        "Type and press Enter to chat. `/attach <path>...` queues files for the next message, \
         `/files` lists them, `/clear` drops them, `/quit` exits."
            .blue()
    );

    let mut pending: Vec<PathBuf> = Vec::new();
    loop {
        let line = tokio::select! {
            line = input.next_line() => line?,
            _ = &mut feed_task => break,
        };
        let Some(line) = line else { break };
        match command::parse(&line) {
            Command::Quit => {
                println!("Exiting chat.");
                break;
            }
            Command::Attach(paths) => {
                pending.extend(paths);
                println!("{}", format!("{} file(s) queued", pending.len()).blue());
                continue;
            }
            Command::Files => {
                for path in &pending {
                    println!("  {}", path.display());
                }
                continue;
            }
            Command::Clear => {
                pending.clear();
                continue;
            }
            Command::Say => {}
        }
        if line.trim().is_empty() && pending.is_empty() {
            continue;
        }

        let files = std::mem::take(&mut pending);
        let batch = match prepare(&uploader, uploader.base_url(), &name, &files, &line, cli.max_files).await {
            Ok(batch) => batch,
            Err(e) => {
                println!("{}", e.to_string().red());
                pending = files;
                continue;
            }
        };
        for failure in &batch.failures {
            println!(
                "{}",
                format!("Could not attach {}: {:#}", failure.path.display(), failure.error).red()
            );
        }
        for message in batch.messages {
            send(&mut writer, &ClientEvent::SendMessage(message)).await?;
        }
    }

    Ok(())
}
