/// Core error type for Triton.
///
/// Adapter crates map their library errors into these variants so the bot
/// core can apply one propagation policy: validation and read failures stop
/// the one service being processed, best-effort failures are logged by the
/// caller and neutralized.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("ledger read failed: {0}")]
    Ledger(String),

    #[error("failed to get staking status: {0}")]
    StakingStatus(Box<Error>),

    #[error("failed to fetch metadata from {address}: {reason}")]
    MetadataFetch { address: String, reason: String },

    #[error("wallet operation failed: {0}")]
    Wallet(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
