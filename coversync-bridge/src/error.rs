/// User-facing failures raised by the bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A device command did not complete successfully.
    ///
    /// Covers both transport failures and calls the device rejected; the
    /// detail field carries the captured response or error for diagnosis.
    #[error("call api for {entity} failed, api: '{command}', args: {args}, response/error: {detail}")]
    CommandFailed {
        entity: String,
        command: &'static str,
        args: String,
        detail: String,
    },
}
