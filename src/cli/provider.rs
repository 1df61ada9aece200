//! `vocalis provider` — inspect or validate backend configuration.

use anyhow::Result;

use crate::config::Config;
use crate::voice::providers::{build_generation_backend, build_tts_backend};

use super::args::{ProviderCliArgs, ProviderCommand};

pub async fn handle_provider_command(args: ProviderCliArgs) -> Result<()> {
    match args.command {
        ProviderCommand::Show => show(),
        ProviderCommand::Test => test().await,
    }
}

fn show() -> Result<()> {
    let config = Config::load()?;

    println!("Generation:");
    println!(
        "  provider: {}",
        config.generation.provider.as_deref().unwrap_or("openai-chat")
    );
    println!(
        "  model:    {}",
        config.generation.model.as_deref().unwrap_or("(default)")
    );
    println!(
        "  endpoint: {}",
        config.generation.api_endpoint.as_deref().unwrap_or("(default)")
    );
    println!(
        "  api key:  {}",
        if config.generation.api_key.is_some() {
            "configured"
        } else {
            "missing"
        }
    );

    println!("Speech:");
    if config.speech.api_key.is_some() {
        println!("  configured ({} / {})", config.speech.language_code, config.speech.voice_name);
        println!("  sample rate: {} Hz", config.speech.sample_rate_hertz);
    } else {
        println!("  not configured — responses will be text-only");
    }

    Ok(())
}

async fn test() -> Result<()> {
    let config = Config::load()?;

    let backend = build_generation_backend(&config.generation)?;
    println!("Testing {}...", backend.name());

    let start = std::time::Instant::now();
    match backend.complete("Reply with the single word: ready").await {
        Ok(text) => {
            println!(
                "Generation OK in {:.1}s: {}",
                start.elapsed().as_secs_f64(),
                text.trim()
            );
        }
        Err(e) => {
            println!("Generation FAILED: {}", e);
        }
    }

    match build_tts_backend(&config.speech)? {
        Some(_) => println!("Speech backend configured"),
        None => println!("Speech backend not configured (text-only mode)"),
    }

    Ok(())
}
