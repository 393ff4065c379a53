//! `decodeframe` binary: decode a file or standard input to standard output.

mod cli;

use std::{pin::Pin, process::ExitCode};

use clap::Parser;
use decodeframe::{
    config::DecodingConfig,
    pipeline::{DecodedBody, DecodedBodyReader, StreamDecoding},
    registry,
};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

type Input = Pin<Box<dyn AsyncRead + Send>>;

async fn run(cli: cli::Cli) -> std::io::Result<u64> {
    let input: Input = match &cli.input {
        Some(path) => Box::pin(tokio::fs::File::open(path).await?),
        None => Box::pin(tokio::io::stdin()),
    };
    let config = DecodingConfig::default().max_length(cli.max_length);
    let decoding = StreamDecoding::new(registry::global(), cli.encoding.as_deref(), config);
    let inbound = ReaderStream::with_capacity(input, cli.chunk_size.get());
    let mut reader = DecodedBodyReader::new(DecodedBody::new(Box::pin(inbound), decoding));
    tokio::io::copy(&mut reader, &mut tokio::io::stdout()).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Standard output carries the decoded body, so logs go to stderr.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = cli::Cli::parse();
    if cli.list_encodings {
        for encoding in registry::global().encodings() {
            println!("{encoding}");
        }
        return ExitCode::SUCCESS;
    }
    match run(cli).await {
        Ok(decoded) => {
            tracing::debug!(decoded, "body decoded");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("decodeframe: {err}");
            ExitCode::FAILURE
        }
    }
}
