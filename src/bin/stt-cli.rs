use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use stt_proxy::http::request::{DEFAULT_RESPONSE_FORMAT, FILE_FIELD, RESPONSE_FORMAT_FIELD};
use stt_proxy::http::response::{download_filename, filename_from_disposition};
use stt_proxy::http::{HEALTH_PATH, TRANSCRIBE_PATH};

#[derive(Parser)]
#[command(name = "stt-cli")]
#[command(about = "Command-line client for the STT upload proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an audio file and save the transcript
    Transcribe {
        /// Audio file to transcribe
        file: PathBuf,

        /// Transcript format (text, srt, vtt, json, ...)
        #[arg(short, long, default_value = DEFAULT_RESPONSE_FORMAT)]
        format: String,

        /// Directory the transcript is written to
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Check proxy status
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Transcribe { file, format, out_dir } => {
            let saved = transcribe(&client, base, &file, &format, &out_dir).await?;
            println!("Saved transcript to {}", saved.display());
        }
        Commands::Health => {
            let res = client.get(format!("{base}{HEALTH_PATH}")).send().await?;
            let json: Value = res.error_for_status()?.json().await?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}

async fn transcribe(
    client: &reqwest::Client,
    base: &str,
    file: &Path,
    format: &str,
    out_dir: &Path,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let audio = tokio::fs::read(file).await?;

    let form = Form::new()
        .text(RESPONSE_FORMAT_FIELD, format.to_string())
        .part(FILE_FIELD, Part::bytes(audio).file_name(name.clone()));

    let res = client
        .post(format!("{base}{TRANSCRIBE_PATH}"))
        .multipart(form)
        .send()
        .await?;

    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(format!("proxy returned {status}: {body}").into());
    }

    // Never let the server pick a directory
    let target = res
        .headers()
        .get(CONTENT_DISPOSITION)
        .and_then(|v| std::str::from_utf8(v.as_bytes()).ok())
        .and_then(filename_from_disposition)
        .and_then(|n| Path::new(&n).file_name().map(|f| f.to_os_string()))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(download_filename(&name, format)));
    let path = out_dir.join(target);

    let mut out = tokio::fs::File::create(&path).await?;
    let mut body = res.bytes_stream();
    while let Some(chunk) = body.next().await {
        out.write_all(&chunk?).await?;
    }
    out.flush().await?;

    Ok(path)
}
