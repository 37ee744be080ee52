use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use flow_tts::{AudioFormat, FlowTTS, FlowTTSConfig, StreamEvent, SynthesizeOptions, VoiceCatalog};

/// FlowTTS - Tencent Cloud TRTC text-to-speech client
#[derive(Parser, Debug)]
#[command(name = "flow-tts")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesize text and write the complete audio file
    Speak {
        #[command(flatten)]
        synthesis: SynthesisArgs,

        /// Output format (wav or pcm)
        #[arg(short = 'f', long = "format", default_value = "wav")]
        format: AudioFormat,

        /// Output file path [default: output.wav or output.pcm, following --format]
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },

    /// Stream synthesis and append raw PCM to a file as chunks arrive
    Stream {
        #[command(flatten)]
        synthesis: SynthesisArgs,

        /// Output file path
        #[arg(short = 'o', long = "output", default_value = "output.pcm")]
        output: PathBuf,
    },

    /// List or search available voices
    Voices {
        /// Case-insensitive match on name, description or language
        #[arg(short = 's', long = "search")]
        search: Option<String>,

        /// Only list flow_01_turbo voices
        #[arg(long = "turbo-only")]
        turbo_only: bool,

        /// Print as JSON
        #[arg(long = "json")]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct SynthesisArgs {
    /// Text to synthesize
    text: String,

    /// Voice id or OpenAI voice name (defaults to the fallback voice)
    #[arg(short = 'v', long = "voice")]
    voice: Option<String>,

    /// Language code (detected from the text if omitted)
    #[arg(short = 'l', long = "language")]
    language: Option<String>,

    /// Speech speed, 0.5 - 2.0
    #[arg(long = "speed", default_value_t = 1.0)]
    speed: f64,

    /// Volume, 0.5 - 2.0
    #[arg(long = "volume", default_value_t = 1.0)]
    volume: f64,

    /// Pitch in semitones, -12 - 12
    #[arg(long = "pitch", default_value_t = 0, allow_negative_numbers = true)]
    pitch: i32,
}

impl SynthesisArgs {
    fn into_options(self) -> SynthesizeOptions {
        let mut options = SynthesizeOptions::new(self.text)
            .speed(self.speed)
            .volume(self.volume)
            .pitch(self.pitch);
        if let Some(voice) = self.voice {
            options = options.voice(voice);
        }
        if let Some(language) = self.language {
            options = options.language(language);
        }
        options
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Logs go to stderr so listings on stdout stay clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Voices {
            search,
            turbo_only,
            json,
        } => list_voices(search.as_deref(), !turbo_only, json),
        Commands::Speak {
            synthesis,
            format,
            output,
        } => {
            let output = output.unwrap_or_else(|| default_output(format));
            let client = build_client(cli.config.as_deref())?;
            speak(&client, synthesis.into_options().format(format), &output).await
        }
        Commands::Stream { synthesis, output } => {
            let client = build_client(cli.config.as_deref())?;
            stream(&client, synthesis.into_options(), &output).await
        }
    }
}

fn default_output(format: AudioFormat) -> PathBuf {
    PathBuf::from(format!("output.{}", format.as_str()))
}

fn build_client(config_path: Option<&Path>) -> anyhow::Result<FlowTTS> {
    let config = match config_path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            FlowTTSConfig::from_file(path)?
        }
        None => FlowTTSConfig::from_env()?,
    };
    Ok(FlowTTS::new(config)?)
}

async fn speak(client: &FlowTTS, options: SynthesizeOptions, output: &Path) -> anyhow::Result<()> {
    let response = client.audio().speech().create(options).await?;

    tokio::fs::write(output, &response.audio)
        .await
        .with_context(|| format!("Failed to write to {}", output.display()))?;

    if let Some(language) = &response.detected_language {
        println!("Detected language: {language}");
    }
    println!(
        "Wrote {} bytes of {} audio to {}",
        response.audio.len(),
        response.format,
        output.display()
    );
    if let Some(request_id) = &response.request_id {
        println!("Request ID: {request_id}");
    }
    Ok(())
}

async fn stream(client: &FlowTTS, options: SynthesizeOptions, output: &Path) -> anyhow::Result<()> {
    let mut events = client.synthesize_stream(options)?;
    let mut file = tokio::fs::File::create(output)
        .await
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let mut written = 0usize;
    while let Some(event) = events.next().await {
        match event? {
            StreamEvent::Audio { data, sequence } => {
                file.write_all(&data).await?;
                written += data.len();
                info!(sequence, bytes = data.len(), "Received audio chunk");
            }
            StreamEvent::End {
                total_chunks,
                request_id,
            } => {
                println!(
                    "Stream finished: {total_chunks} chunks, request ID {}",
                    request_id.as_deref().unwrap_or("-")
                );
            }
        }
    }
    file.flush().await?;

    println!("Wrote {written} bytes of PCM audio to {}", output.display());
    Ok(())
}

fn list_voices(search: Option<&str>, include_extended: bool, json: bool) -> anyhow::Result<()> {
    let catalog = VoiceCatalog::builtin()?;
    let voices = match search {
        Some(query) => catalog.search(query, include_extended),
        None => catalog.voices(include_extended).preset,
    };

    if json {
        let rendered = serde_json::to_string_pretty(&voices)
            .map_err(|e| anyhow!("Failed to render voices: {e}"))?;
        println!("{rendered}");
        return Ok(());
    }

    for voice in &voices {
        let model = catalog.model_for_voice(&voice.id)?;
        println!(
            "{:<20} {:<14} {:<6} {}",
            voice.id,
            model.as_str(),
            voice.language,
            voice.name
        );
        if let Some(description) = &voice.description {
            println!("{:<20} {description}", "");
        }
    }
    println!("{} voice(s)", voices.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("flow-tts").chain(args.iter().copied())).unwrap()
    }

    fn speak_output(cli: Cli) -> PathBuf {
        match cli.command {
            Commands::Speak { format, output, .. } => {
                output.unwrap_or_else(|| default_output(format))
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_speak_default_output_follows_format() {
        assert_eq!(
            speak_output(parse(&["speak", "hello"])),
            PathBuf::from("output.wav")
        );
        assert_eq!(
            speak_output(parse(&["speak", "hello", "--format", "pcm"])),
            PathBuf::from("output.pcm")
        );
    }

    #[test]
    fn test_speak_explicit_output_wins() {
        assert_eq!(
            speak_output(parse(&["speak", "hello", "-f", "pcm", "-o", "voice.raw"])),
            PathBuf::from("voice.raw")
        );
    }

    #[test]
    fn test_negative_pitch_is_accepted() {
        match parse(&["stream", "hello", "--pitch", "-3"]).command {
            Commands::Stream { synthesis, .. } => assert_eq!(synthesis.pitch, -3),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
