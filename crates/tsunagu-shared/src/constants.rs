/// Application name
pub const APP_NAME: &str = "Tsunagu";

/// Aggregate size ceiling for one send batch of attachments (5 MiB).
/// Applied across all files in the batch, not per file.
pub const MAX_ATTACHMENT_BATCH_BYTES: usize = 5 * 1024 * 1024;

/// Maximum number of attachments in one message.
pub const MAX_ATTACHMENTS_PER_MESSAGE: usize = 5;

/// Maximum message content length in bytes (64 KiB)
pub const MAX_MESSAGE_CONTENT_BYTES: usize = 65_536;

/// Room-list preview is truncated to this many characters.
pub const PREVIEW_MAX_CHARS: usize = 60;

/// Preview text used when a message carries attachments but no text.
pub const PREVIEW_ATTACHMENT_FALLBACK: &str = "(添付ファイル)";

/// Viewport widths at or below this are rendered in the single-pane
/// mobile presentation.
pub const MOBILE_BREAKPOINT_PX: u32 = 768;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Header carrying the verified caller id, stamped by the auth gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the verified caller role, stamped by the auth gateway.
pub const USER_ROLE_HEADER: &str = "x-user-role";
