//! Command line interface for the `decodeframe` binary.
//!
//! Kept free of library imports so `build.rs` can include it to render the
//! manual page.

use std::{num::NonZeroUsize, path::PathBuf};

use clap::Parser;

/// Command line arguments for the `decodeframe` binary.
#[derive(Debug, Parser)]
#[command(
    name = "decodeframe",
    version,
    about = "Decode a content-encoded body in bounded chunks"
)]
pub struct Cli {
    /// Content-encoding token of the input, for example `gzip` or `br`.
    /// Defaults to `identity`.
    #[arg(short, long)]
    pub encoding: Option<String>,

    /// Maximum decoded size in bytes; 0 disables the limit.
    #[arg(short, long, default_value_t = 0)]
    pub max_length: usize,

    /// Bytes read from the input per decode step.
    #[arg(short, long, default_value = "8192")]
    pub chunk_size: NonZeroUsize,

    /// List the supported encodings and exit.
    #[arg(long)]
    pub list_encodings: bool,

    /// Input file; standard input when omitted.
    pub input: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;

    #[test]
    fn parses_decoding_options() {
        let cli = Cli::parse_from([
            "decodeframe",
            "--encoding",
            "gzip",
            "--max-length",
            "1024",
            "-c",
            "512",
            "body.gz",
        ]);
        assert_eq!(cli.encoding.as_deref(), Some("gzip"));
        assert_eq!(cli.max_length, 1024);
        assert_eq!(cli.chunk_size.get(), 512);
        assert_eq!(cli.input.as_deref(), Some(std::path::Path::new("body.gz")));
    }

    #[test]
    fn defaults_read_stdin_without_limit() {
        let cli = Cli::parse_from(["decodeframe"]);
        assert!(cli.encoding.is_none());
        assert_eq!(cli.max_length, 0);
        assert_eq!(cli.chunk_size.get(), 8192);
        assert!(cli.input.is_none());
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert!(Cli::try_parse_from(["decodeframe", "--chunk-size", "0"]).is_err());
    }
}
