#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), forbid(clippy::expect_used))]
//! Print the OpenAPI document as JSON, or YAML with `--yaml`.
//!
//! # Examples
//! ```sh
//! cargo run --manifest-path backend/Cargo.toml --bin openapi-dump > openapi.json
//! ```

use std::io;

use backend::doc::ApiDoc;
use clap::Parser;
use utoipa::OpenApi;

/// Command-line options for the dump.
#[derive(Debug, Parser)]
#[command(name = "openapi-dump", about = "Print the API's OpenAPI document")]
struct Cli {
    /// Emit YAML instead of pretty JSON.
    #[arg(long)]
    yaml: bool,
}

fn render(yaml: bool) -> io::Result<String> {
    let doc = ApiDoc::openapi();
    if yaml {
        doc.to_yaml().map_err(io::Error::other)
    } else {
        doc.to_pretty_json().map_err(io::Error::other)
    }
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();
    println!("{}", render(cli.yaml)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(false, "\"openapi\"")]
    #[case(true, "openapi:")]
    fn renders_requested_format(#[case] yaml: bool, #[case] marker: &str) {
        let out = render(yaml).expect("render document");
        assert!(out.contains(marker));
    }

    #[rstest]
    fn parses_yaml_flag() {
        let cli = Cli::parse_from(["openapi-dump", "--yaml"]);
        assert!(cli.yaml);
    }
}
