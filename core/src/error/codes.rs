/// Stable, machine-readable error codes surfaced by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    Success = 0,
    GeneralError = 1,
    ParseError = 2,
    ValidationError = 3,
    AgentNotFound = 10,
    DependencyError = 11,
    CircularDependency = 12,
    SchedulingError = 13,
    AgentFailed = 20,
    MissingInput = 21,
    Timeout = 30,
    Cancelled = 31,
    StateError = 40,
    StoreError = 41,
    ConfigError = 50,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}
