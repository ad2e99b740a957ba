use clap::{Args, Parser, Subcommand};
use flannel_operator_core::{DEFAULT_FLANNEL_IMAGE, DEFAULT_WORKLOAD_NAMESPACE};

use crate::controller::{
    queue::{DEFAULT_MAX_ATTEMPTS, DEFAULT_MIN_INTERVAL, DEFAULT_RETRY_BASE_DELAY, DEFAULT_RETRY_MAX_DELAY},
    DEFAULT_REGISTRATION_TIMEOUT, DEFAULT_RESYNC_PERIOD,
};

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    #[command(flatten)]
    pub global_args: GlobalArgs,
    #[command(flatten)]
    pub operator_args: OperatorArgs,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// override default kubeconfig (in-cluster config is used when neither this nor a context is set)
    #[arg(long, global = true, env = "FLANNEL_OPERATOR_KUBECONFIG")]
    pub kube_config: Option<String>,
    /// override default kubeconfig context
    #[arg(long, global = true, env = "FLANNEL_OPERATOR_KUBE_CONTEXT")]
    pub kube_context: Option<String>,
    /// enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose_logging: bool,
    /// enable trace output (more detailed than verbose, overrides it if present)
    #[arg(long = "trace", global = true)]
    pub trace_logging: bool,
}

impl GlobalArgs {
    pub fn get_log_level(&self) -> LogLevel {
        if self.trace_logging {
            return LogLevel::Trace;
        }

        if self.verbose_logging {
            return LogLevel::Verbose;
        }

        LogLevel::Normal
    }
}

pub enum LogLevel {
    Normal,
    Verbose,
    Trace,
}

#[derive(Debug, Args)]
pub struct OperatorArgs {
    /// namespace the flannel client and server workloads are deployed to
    #[arg(short = 'n', long, global = true, env = "FLANNEL_OPERATOR_NAMESPACE", default_value = DEFAULT_WORKLOAD_NAMESPACE)]
    pub namespace: String,
    /// flannel image used by both the client and the server workloads
    #[arg(long, global = true, env = "FLANNEL_OPERATOR_IMAGE", default_value = DEFAULT_FLANNEL_IMAGE)]
    pub flannel_image: String,
    /// seconds between re-deliveries of every known network
    #[arg(long, global = true, env = "FLANNEL_OPERATOR_RESYNC_SECONDS", default_value_t = DEFAULT_RESYNC_PERIOD.as_secs(), value_parser = clap::value_parser!(u64).range(1..))]
    pub resync_seconds: u64,
    /// delay before the first retry of a failed reconciliation, in milliseconds
    #[arg(long, global = true, env = "FLANNEL_OPERATOR_RETRY_BASE_MS", default_value_t = DEFAULT_RETRY_BASE_DELAY.as_millis() as u64)]
    pub retry_base_ms: u64,
    /// upper bound of the retry delay, in seconds
    #[arg(long, global = true, env = "FLANNEL_OPERATOR_RETRY_MAX_SECONDS", default_value_t = DEFAULT_RETRY_MAX_DELAY.as_secs())]
    pub retry_max_seconds: u64,
    /// number of failed runs after which a reconciliation is dropped
    #[arg(long, global = true, env = "FLANNEL_OPERATOR_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: u32,
    /// minimum pause between two reconciliations, in milliseconds
    #[arg(long, global = true, env = "FLANNEL_OPERATOR_MIN_INTERVAL_MS", default_value_t = DEFAULT_MIN_INTERVAL.as_millis() as u64)]
    pub min_interval_ms: u64,
    /// how long to wait for the FlannelNetwork type to be served after registering it, in seconds
    #[arg(long, global = true, env = "FLANNEL_OPERATOR_REGISTRATION_TIMEOUT_SECONDS", default_value_t = DEFAULT_REGISTRATION_TIMEOUT.as_secs())]
    pub registration_timeout_seconds: u64,
    /// keep the FlannelNetwork resource type (and with it every network) registered on shutdown
    #[arg(long, global = true, env = "FLANNEL_OPERATOR_RETAIN_RESOURCE_TYPE")]
    pub retain_resource_type: bool,
    /// if set, cluster writes are only validated by the API server and never persisted
    #[arg(long, global = true, env = "FLANNEL_OPERATOR_DRY_RUN")]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum Commands {
    /// run the operator (default)
    #[command(alias = "r")]
    Run,
    /// print the FlannelNetwork resource definition as YAML
    Crd,
    /// list networks on the cluster together with their client workloads
    #[command(alias = "ls")]
    List,
}
