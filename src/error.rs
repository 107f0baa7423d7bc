use thiserror::Error;

/// Errors reported to the client of a display.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum HwcError {
    #[error("The configuration is invalid")]
    BadConfig,
    #[error("The display is invalid or unusable")]
    BadDisplay,
    #[error("The layer does not exist")]
    BadLayer,
    #[error("A parameter is invalid")]
    BadParameter,
    #[error("Resources are exhausted")]
    NoResources,
    #[error("The display has not been validated")]
    NotValidated,
    #[error("The operation is not supported")]
    Unsupported,
    #[error("A seamless config change is not possible")]
    SeamlessNotAllowed,
}

/// Errors reported by the display engine.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum EngineError {
    #[error("Undefined engine error")]
    Undefined,
    #[error("The engine does not support the operation")]
    NotSupported,
    #[error("The engine denied permission")]
    Permission,
    #[error("The display has shut down")]
    ShutDown,
    #[error("The engine has not validated the stack")]
    NotValidated,
    #[error("Invalid parameters")]
    Parameters,
    #[error("The engine ran out of resources")]
    Resources,
    #[error("The request was deferred")]
    Deferred,
    #[error("The engine timed out")]
    Timeout,
    #[error("The engine is busy")]
    Busy,
}
