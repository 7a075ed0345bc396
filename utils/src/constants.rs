use log::LevelFilter;

pub const DEFAULT_REGION: &str = "eu-west-2";
pub const DEFAULT_LEVEL_FILTER: LevelFilter = LevelFilter::Info;
pub const DEFAULT_ASSUME_ROLE_SESSION_DURATION: u64 = 3600;
pub const ASSUME_ROLE_SESSION_NAME: &str = "eks-sandbox";
/// A single attempt per request; failures are surfaced rather than retried.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;
