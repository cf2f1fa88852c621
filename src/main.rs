use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stride_voice::audio::{self, AudioPlayback, AudioSink, SAMPLE_RATE, SampleBuffer};
use stride_voice::conversation::{ConversationController, ConversationState, RecognitionEvent};
use stride_voice::providers::{
    ChatStream, GeminiClient, NullRecognizer, SpeechRecognizer, SpeechSynthesizer,
};
use stride_voice::speech::{SpeechQueue, speak_once};
use stride_voice::Config;

/// Stride - voice conversation pipeline for the Stride fitness assistant
#[derive(Parser)]
#[command(name = "stride", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Synthesize text and play it
    Say {
        /// Text to speak
        text: String,

        /// Write decoded audio to a WAV file instead of playing it
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
    },
    /// Test speaker output
    TestSpeaker,
    /// Typed conversation with the assistant (stand-in for microphone input)
    Chat,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,stride_voice=info",
        1 => "info,stride_voice=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Say { text, output } => say(&text, output.as_deref()).await,
        Command::TestSpeaker => test_speaker(),
        Command::Chat => chat().await,
    }
}

/// Synthesize text and play it (or dump it to a WAV file)
async fn say(text: &str, output: Option<&Path>) -> anyhow::Result<()> {
    let config = Config::load()?;
    let gemini = Arc::new(GeminiClient::new(config.api_key, &config.voice));

    if let Some(path) = output {
        let payload = gemini
            .synthesize(text)
            .await?
            .ok_or_else(|| anyhow::anyhow!("synthesizer returned no audio"))?;
        let buffer = audio::decode_base64_pcm(&payload)?;
        audio::write_wav(&buffer, path)?;
        println!("Wrote {} samples to {}", buffer.len(), path.display());
    } else {
        let sink: Arc<dyn AudioSink> = Arc::new(AudioPlayback::new());
        speak_once(gemini.as_ref(), &sink, text).await?;
    }

    Ok(())
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples at {SAMPLE_RATE} Hz...", samples.len());

    let playback = AudioPlayback::new();
    playback.play(&SampleBuffer::from_samples(samples))?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");

    Ok(())
}

/// Typed conversation loop driving the full state machine
async fn chat() -> anyhow::Result<()> {
    let config = Config::load()?;
    let gemini = Arc::new(GeminiClient::new(config.api_key, &config.voice));
    let sink: Arc<dyn AudioSink> = Arc::new(AudioPlayback::new());

    let queue = SpeechQueue::new(
        Arc::clone(&gemini) as Arc<dyn SpeechSynthesizer>,
        sink,
    );
    let controller = ConversationController::new(
        gemini as Arc<dyn ChatStream>,
        Arc::new(NullRecognizer) as Arc<dyn SpeechRecognizer>,
        queue,
    );

    for turn in controller.turns() {
        println!("assistant: {}", turn.text);
    }
    println!("Type a message and press enter (empty line to quit).\n");

    loop {
        let line = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line)
        })
        .await??;

        let line = line.trim().to_string();
        if line.is_empty() {
            break;
        }

        if !controller.try_start_listening()? {
            println!("(assistant is busy, try again in a moment)");
            continue;
        }
        controller.handle_recognition(RecognitionEvent::Result {
            transcript: line,
            is_final: true,
        })?;
        controller.stop_listening().await;

        // Wait for the spoken reply to finish before prompting again
        let mut state = controller.subscribe();
        state.wait_for(|s| *s == ConversationState::Idle).await?;

        if let Some(turn) = controller.turns().last() {
            println!("assistant: {}\n", turn.text);
        }
    }

    Ok(())
}
