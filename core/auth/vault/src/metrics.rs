use anyhow::Result;
use once_cell::sync::Lazy;
use prometheus::CounterVec;
use prometheus::Histogram;
use prometheus::HistogramOpts;
use prometheus::Opts;
use prometheus::Registry;

use regauth_auth::AuthError;
use regauth_auth::UserInfo;

pub static LOOKUPS_COUNT: Lazy<CounterVec> = Lazy::new(|| {
    CounterVec::new(
        Opts::new(
            "regauth_vault_lookups",
            "Number of user lookups performed against vault, by outcome",
        ),
        &["outcome"],
    )
    .expect("Failed to create LOOKUPS_COUNT counter")
});

pub static LOOKUPS_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(HistogramOpts::new(
        "regauth_vault_lookups_duration",
        "Duration (in seconds) of user lookups performed against vault",
    ))
    .expect("Failed to create LOOKUPS_DURATION histogram")
});

/// Count the outcome of a lookup.
pub fn observe(result: &Result<UserInfo, AuthError>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(AuthError::Forbidden) => "forbidden",
        Err(AuthError::Internal) => "internal",
        Err(AuthError::Backend { .. }) => "backend",
    };
    LOOKUPS_COUNT.with_label_values(&[outcome]).inc();
}

/// Register vault backend metrics with the given registry.
pub fn register_metrics(registry: &Registry) -> Result<()> {
    registry.register(Box::new(LOOKUPS_COUNT.clone()))?;
    registry.register(Box::new(LOOKUPS_DURATION.clone()))?;
    Ok(())
}
