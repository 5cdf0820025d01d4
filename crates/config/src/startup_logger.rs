//! Startup and shutdown banners

use std::env;
use tracing::{info, warn};

use crate::settings::Settings;

/// Log service, platform and environment details at startup
pub fn log_service_info() {
	info!("=== NutriScan Engine Starting ===");
	info!("🚀 Service: nutriscan v{}", env!("CARGO_PKG_VERSION"));
	info!("💻 Platform: {} ({})", env::consts::OS, env::consts::ARCH);

	if let Ok(cwd) = env::current_dir() {
		info!("📁 Working Directory: {}", cwd.display());
	}
	if let Ok(rust_log) = env::var("RUST_LOG") {
		info!("🔧 RUST_LOG: {}", rust_log);
	}

	info!(
		"🕒 Started at: {}",
		chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
	);
}

/// Log the effective engine configuration once it is ready
pub fn log_engine_ready(settings: &Settings, signing_identity: Option<&str>) {
	let providers = settings.enabled_providers();
	info!("✅ Engine ready with {} fan-out providers", providers.len());
	for provider in &providers {
		info!(
			"   • {} via {} (model {}, timeout {}ms)",
			provider.display_name(),
			provider.adapter_id,
			provider.model,
			provider.timeout_ms
		);
	}

	match settings.fallback_provider() {
		Some(fallback) => info!("🛟 Fallback provider: {}", fallback.provider_id),
		None => info!("🛟 No fallback provider configured"),
	}

	info!(
		"⏱️ Timeouts: {}ms per provider, {}ms global",
		settings.timeouts.per_provider_ms, settings.timeouts.global_ms
	);
	info!("🧮 Merge strategy: {}", settings.aggregation.merge_strategy);

	match signing_identity {
		Some(identity) => {
			info!("🔏 Signing results as '{}'", identity);
			if let Some(value) = settings.security.signing_keys.get(identity) {
				if value.is_insecure_default() {
					warn!("Signing key for '{}' is an insecure default", identity);
				}
			}
		},
		None => info!("🔏 Result signing disabled"),
	}
}

pub fn log_service_shutdown() {
	info!("🛑 NutriScan Engine Shutting Down");
	info!(
		"🕒 Shutdown at: {}",
		chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
	);
}
