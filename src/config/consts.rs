/// Section holding processor selection and processor attributes.
pub const TASK_SECTION: &str = "task";
/// Section holding environment variables exported to task commands.
pub const ENV_SECTION: &str = "env";
/// Key under `task` naming the processor backend.
pub const PROCESSOR_KEY: &str = "processor";
/// Explicit size of the session's concurrency group.
pub const POOL_SIZE_KEY: &str = "poolSize";
/// Dotted path of a caller-supplied run identifier.
pub const UNIQUE_ID_KEY: &str = "session.uniqueId";
/// Pool size used when the platform cannot report its parallelism.
pub const FALLBACK_POOL_SIZE: usize = 4;
/// Process exit code reported when a session is aborted.
pub const SESSION_ABORTED_EXIT_CODE: i32 = 10;
/// Upper bound on waiting for the concurrency group to wind down after a clean terminate.
pub const GROUP_SHUTDOWN_TIMEOUT_SECS: u64 = 10;
