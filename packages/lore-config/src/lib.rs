mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Cache, Config, ExtractorProviderConfig, OcrProviderConfig, OracleProviderConfig, Pipeline,
	Postgres, Providers, Queue, Redis, ResearchProviderConfig, Retry, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.redis.url.trim().is_empty() {
		return Err(Error::Validation { message: "cache.redis.url must be non-empty.".to_string() });
	}
	if cfg.queue.batch_size == 0 {
		return Err(Error::Validation {
			message: "queue.batch_size must be greater than zero.".to_string(),
		});
	}
	if cfg.queue.poll_interval_ms == 0 {
		return Err(Error::Validation {
			message: "queue.poll_interval_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.queue.worker_concurrency == 0 {
		return Err(Error::Validation {
			message: "queue.worker_concurrency must be greater than zero.".to_string(),
		});
	}
	if cfg.queue.stale_after_secs <= 0 {
		return Err(Error::Validation {
			message: "queue.stale_after_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.queue.stale_sweep_interval_secs <= 0 {
		return Err(Error::Validation {
			message: "queue.stale_sweep_interval_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.retry.fatal_attempts == 0 {
		return Err(Error::Validation {
			message: "retry.fatal_attempts must be greater than zero.".to_string(),
		});
	}
	if cfg.retry.degrade_attempts == 0 {
		return Err(Error::Validation {
			message: "retry.degrade_attempts must be greater than zero.".to_string(),
		});
	}
	if cfg.pipeline.per_item_estimate_secs == 0 {
		return Err(Error::Validation {
			message: "pipeline.per_item_estimate_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.pipeline.merge_window_secs == 0 {
		return Err(Error::Validation {
			message: "pipeline.merge_window_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.pipeline.tldr_max_lines == 0 {
		return Err(Error::Validation {
			message: "pipeline.tldr_max_lines must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.extractor.token.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.extractor.token must be non-empty.".to_string(),
		});
	}

	for (label, key) in [
		("ocr", &cfg.providers.ocr.api_key),
		("oracle", &cfg.providers.oracle.api_key),
		("research", &cfg.providers.research.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	for (label, timeout) in [
		("extractor", cfg.providers.extractor.timeout_ms),
		("ocr", cfg.providers.ocr.timeout_ms),
		("oracle", cfg.providers.oracle.timeout_ms),
		("research", cfg.providers.research.timeout_ms),
	] {
		if timeout == 0 {
			return Err(Error::Validation {
				message: format!("Provider {label} timeout_ms must be greater than zero."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg
		.pipeline
		.default_profile
		.as_deref()
		.map(|profile| profile.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.pipeline.default_profile = None;
	}
	if !cfg.cache.redis.key_prefix.is_empty() && !cfg.cache.redis.key_prefix.ends_with(':') {
		cfg.cache.redis.key_prefix.push(':');
	}
}
