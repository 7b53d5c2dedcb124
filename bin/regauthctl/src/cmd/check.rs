//! Validate the identity backend configuration.
use anyhow::Result;

use regauth_auth::IdentityBackends;
use regauth_conf::Conf;
use regauth_context::Context;

/// Validate the configuration of the selected identity backend.
pub fn run(context: &Context, backends: &IdentityBackends, conf: &Conf) -> Result<i32> {
    backends.conf_check(context, &conf.identity)?;
    slog::info!(
        context.logger, "Identity backend configuration is valid";
        "backend" => &conf.identity.backend,
    );
    println!("Identity backend '{}' configuration is valid", conf.identity.backend);
    Ok(0)
}
