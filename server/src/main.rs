use std::{env, path, time::Duration};

use strata::AppBuilder;
use strata::error::{ClResult, Error};

pub struct Config {
	pub listen: Option<String>,
	pub jwt_secret: Option<String>,
	pub cache_ttl: Option<Duration>,
	pub cache_capacity: Option<usize>,
	pub audit_capacity: Option<usize>,
	pub reconcile_interval: Option<Duration>,
	pub users_file: Option<path::PathBuf>,
	pub layers_file: Option<path::PathBuf>,
	pub audit_file: Option<path::PathBuf>,
}

fn var(name: &str) -> Option<String> {
	env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str) -> ClResult<Option<T>> {
	var(name)
		.map(|v| {
			v.trim().parse().map_err(|_| Error::ValidationError(format!("Invalid {}: {}", name, v)))
		})
		.transpose()
}

impl Config {
	fn from_env() -> ClResult<Self> {
		Ok(Config {
			listen: var("LISTEN"),
			jwt_secret: var("JWT_SECRET"),
			cache_ttl: parse_var("CACHE_TTL_SECS")?.map(Duration::from_secs),
			cache_capacity: parse_var("CACHE_CAPACITY")?,
			audit_capacity: parse_var("AUDIT_CAPACITY")?,
			reconcile_interval: parse_var("RECONCILE_INTERVAL_SECS")?.map(Duration::from_secs),
			users_file: var("USERS_FILE").map(path::PathBuf::from),
			layers_file: var("LAYERS_FILE").map(path::PathBuf::from),
			audit_file: var("AUDIT_FILE").map(path::PathBuf::from),
		})
	}
}

#[tokio::main]
async fn main() -> ClResult<()> {
	let config = Config::from_env()?;

	let mut builder = AppBuilder::new();
	if let Some(listen) = config.listen {
		builder.listen(listen);
	}
	if let Some(secret) = config.jwt_secret {
		builder.jwt_secret(secret);
	}
	if let Some(ttl) = config.cache_ttl {
		builder.cache_ttl(ttl);
	}
	if let Some(capacity) = config.cache_capacity {
		builder.cache_capacity(capacity);
	}
	if let Some(capacity) = config.audit_capacity {
		builder.audit_capacity(capacity);
	}
	if let Some(interval) = config.reconcile_interval {
		builder.reconcile_interval(interval);
	}
	if let Some(path) = config.users_file {
		builder.users_file(path);
	}
	if let Some(path) = config.layers_file {
		builder.layers_file(path);
	}
	if let Some(path) = config.audit_file {
		builder.audit_file(path);
	}

	builder.run().await
}

// vim: ts=4
