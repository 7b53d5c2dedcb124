//! Operator tool to validate the registry authentication configuration and look identities up.
use anyhow::Context as AnyContext;
use anyhow::Result;
use clap::Parser;

use regauth_auth::IdentityBackends;
use regauth_conf::Conf;
use regauth_context::Context;

mod cmd;
mod logging;

pub use self::cmd::Cli;
pub use self::logging::LogLevel;

/// The async runtime for the process could not be initialised.
#[derive(Debug, thiserror::Error)]
#[error("unable to initialise the async runtime")]
pub struct RuntimeInitError;

/// Registry of all identity backends bundled with the tool.
pub fn default_backends() -> IdentityBackends {
    let mut backends = IdentityBackends::empty();
    backends
        .with_factory("static", regauth_auth_static::StaticFactory)
        .with_factory("vault", regauth_auth_vault::VaultFactory);
    backends
}

/// Invoke the selected command and return the process exit code.
pub async fn execute(cli: Cli, conf: Conf) -> Result<i32> {
    let level = cli.log_level.map(Into::into).unwrap_or(conf.log.level);
    let logger = self::logging::configure(level);
    let context = Context::root(logger).build();
    slog::debug!(context.logger, "regauthctl starting"; "config" => &cli.config);

    let backends = default_backends();
    let result = match &cli.command {
        cmd::Command::Check => cmd::check::run(&context, &backends, &conf),
        cmd::Command::Lookup(args) => cmd::lookup::run(&context, &backends, &conf, args).await,
    };
    match &result {
        Ok(0) => slog::debug!(context.logger, "regauthctl exiting with success"),
        Ok(code) => slog::info!(context.logger, "regauthctl exiting with failure"; "code" => code),
        Err(error) => slog::error!(
            context.logger, "regauthctl exiting with error";
            "error" => format!("{:#}", error),
        ),
    };
    result
}

/// Initialise the async runtime for the process and invoke [`execute`].
pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    let conf = regauth_conf::load(&cli.config)?;
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context(RuntimeInitError)?
        .block_on(execute(cli, conf))
}
