//! NutriScan CLI
//!
//! Analyze a meal photo with the configured providers, or verify a previously
//! produced result.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose, Engine as _};
use clap::{Parser, Subcommand};
use nutriscan::{
	init_tracing, load_config, load_config_from, log_service_info, AnalysisInput, AnalysisResult,
	CancellationToken, CredentialSet, EngineBuilder, Settings,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "nutriscan")]
#[command(about = "Multi-provider meal image nutrition analysis")]
#[command(version)]
struct Cli {
	/// Config file (without extension, as understood by the `config` crate)
	#[arg(short, long, global = true, env = "NUTRISCAN_CONFIG")]
	config: Option<String>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Analyze one image and print the result as JSON
	Analyze {
		/// Path to the image
		#[arg(short, long)]
		image: PathBuf,

		/// MIME type; guessed from the extension when omitted
		#[arg(long)]
		mime_type: Option<String>,

		/// Replace the default instruction sent to providers
		#[arg(long)]
		instruction: Option<String>,

		/// Sign the result as this identity
		#[arg(long)]
		signing_identity: Option<String>,

		/// Per-request credential, `provider_id=key`; may be repeated
		#[arg(long = "credential", value_parser = parse_credential)]
		credentials: Vec<(String, String)>,
	},
	/// Verify the integrity proof of a result file
	Verify {
		/// Path to a JSON result produced by `analyze`
		#[arg(short, long)]
		result: PathBuf,

		#[arg(long)]
		signing_identity: Option<String>,
	},
}

fn parse_credential(raw: &str) -> Result<(String, String), String> {
	match raw.split_once('=') {
		Some((provider, key)) if !provider.trim().is_empty() && !key.is_empty() => {
			Ok((provider.trim().to_string(), key.to_string()))
		},
		_ => Err(format!("expected provider_id=key, got '{}'", raw)),
	}
}

fn mime_type_for(path: &Path) -> &'static str {
	let extension = path
		.extension()
		.and_then(|e| e.to_str())
		.map(|e| e.to_ascii_lowercase());
	match extension.as_deref() {
		Some("png") => "image/png",
		Some("webp") => "image/webp",
		Some("gif") => "image/gif",
		Some("heic") => "image/heic",
		_ => "image/jpeg",
	}
}

fn load_settings(path: Option<&str>) -> Result<Settings, Box<dyn std::error::Error>> {
	let settings = match path {
		Some(path) => load_config_from(path)?,
		None => load_config()?,
	};
	Ok(settings)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	dotenvy::dotenv().ok();
	let cli = Cli::parse();

	let settings = load_settings(cli.config.as_deref())?;
	init_tracing(&settings).map_err(|e| e as Box<dyn std::error::Error>)?;
	log_service_info();

	let engine = EngineBuilder::new().with_settings(settings).build()?;

	match cli.command {
		Command::Analyze {
			image,
			mime_type,
			instruction,
			signing_identity,
			credentials,
		} => {
			engine.initialize(signing_identity.as_deref()).await?;

			let bytes = tokio::fs::read(&image).await?;
			let mime_type = mime_type.unwrap_or_else(|| mime_type_for(&image).to_string());
			let mut input = AnalysisInput::new(general_purpose::STANDARD.encode(bytes), mime_type);
			if let Some(instruction) = instruction {
				input = input.with_instruction(instruction);
			}

			let mut credential_set = CredentialSet::new();
			for (provider_id, key) in credentials {
				credential_set.insert(provider_id, key);
			}

			let cancel = CancellationToken::new();
			let on_interrupt = cancel.clone();
			tokio::spawn(async move {
				if tokio::signal::ctrl_c().await.is_ok() {
					warn!("Interrupted, cancelling analysis");
					on_interrupt.cancel();
				}
			});

			let outcome = engine
				.analyze_with_cancel(input, &credential_set, cancel)
				.await;
			engine.shutdown().await;

			let result = outcome?;
			info!(
				"Analysis {} finished: {} items, {} kcal, {} confidence",
				result.analysis_id,
				result.items.len(),
				result.totals.calories,
				result.confidence
			);
			println!("{}", serde_json::to_string_pretty(&result)?);
		},
		Command::Verify {
			result,
			signing_identity,
		} => {
			engine.initialize(signing_identity.as_deref()).await?;

			let raw = tokio::fs::read_to_string(&result).await?;
			let analysis: AnalysisResult = serde_json::from_str(&raw)?;
			let valid = engine.verify(&analysis).await?;
			engine.shutdown().await;

			if !valid {
				return Err(format!("integrity proof of {} is not valid", result.display()).into());
			}
			println!("{}: valid", analysis.analysis_id);
		},
	}

	Ok(())
}
