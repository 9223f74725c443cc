//! Command-line interface.

use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::config::ServeOptions;
use crate::observability::AccessLogFormat;

#[derive(Debug, Parser)]
#[command(name = "now-serve")]
#[command(version, about = "Serve a project's lambdas locally, the way the deployment platform routes them", long_about = None)]
pub struct Cli {
    /// Project directory containing now.json
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Access log format
    #[arg(short, long, value_enum, default_value_t = AccessLogFormat::Combined)]
    pub format: AccessLogFormat,

    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Seconds before a request is answered with 408
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Largest accepted request body, in bytes
    #[arg(long, default_value_t = 5 * 1024 * 1024)]
    pub max_body_bytes: usize,

    /// Address for the Prometheus metrics endpoint (disabled when unset)
    #[arg(long)]
    pub metrics_address: Option<SocketAddr>,
}

impl Cli {
    pub fn into_options(self) -> ServeOptions {
        ServeOptions {
            root: self.path,
            bind_address: SocketAddr::new(self.host, self.port),
            access_log: self.format,
            request_timeout_secs: self.timeout_secs,
            max_body_bytes: self.max_body_bytes,
            metrics_address: self.metrics_address,
        }
    }
}
