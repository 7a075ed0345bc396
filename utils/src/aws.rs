use crate::constants::{ASSUME_ROLE_SESSION_NAME, DEFAULT_ASSUME_ROLE_SESSION_DURATION};
use crate::error::{self, Result};
use aws_config::default_provider::credentials::default_provider;
use aws_config::sts::AssumeRoleProvider;
use aws_config::BehaviorVersion;
use aws_smithy_types::retry::RetryConfig;
use aws_types::region::Region;
use aws_types::SdkConfig;
use log::info;
use snafu::ensure;
use std::time::Duration;

/// Set up the config for aws calls in `region`, assuming `assume_role` through STS when a role
/// arn is provided. `max_attempts` is handed to the SDK's standard retry strategy; a value of `1`
/// means every request is sent exactly once. Credentials are resolved lazily by the SDK, so
/// missing credentials surface on the first request.
pub async fn aws_config(
    region: &str,
    assume_role: &Option<String>,
    assume_role_session_duration: &Option<u64>,
    max_attempts: u32,
) -> Result<SdkConfig> {
    ensure!(!region.trim().is_empty(), error::EmptyRegionSnafu);
    let region = Region::new(region.trim().to_string());
    info!(
        "Creating a custom region provider for '{}' to be used in the aws config.",
        region
    );

    let mut config_loader = aws_config::defaults(BehaviorVersion::latest())
        .region(region.clone())
        .retry_config(RetryConfig::standard().with_max_attempts(max_attempts.max(1)));

    if let Some(role_arn) = assume_role {
        info!("Using credentials for assumed role '{}'.", role_arn);
        let provider = AssumeRoleProvider::builder(role_arn)
            .region(region)
            .session_name(ASSUME_ROLE_SESSION_NAME)
            .session_length(Duration::from_secs(
                assume_role_session_duration.unwrap_or(DEFAULT_ASSUME_ROLE_SESSION_DURATION),
            ))
            .build_from_provider(default_provider().await)
            .await;
        config_loader = config_loader.credentials_provider(provider);
    }

    Ok(config_loader.load().await)
}
