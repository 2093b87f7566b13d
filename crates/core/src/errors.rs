use thiserror::Error;

/// User-correctable scheduling input failures.
///
/// Messages quote the offending substring verbatim so the dispatch layer can
/// surface them to the requester without rewording.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid time range format: {range}. Expected format: HH:MM-HH:MM")]
    RangeFormat { range: String },
    #[error("invalid time format: {time}. Expected format: HH:MM")]
    TimeFormat { time: String },
    #[error("invalid time range: {range}. End time must be later than start time")]
    RangeOrder { range: String },
    #[error("unparseable date: {date}. Expected format: YYYY-MM-DD")]
    DateFormat { date: String },
    #[error("date {date} is outside the {window_days}-day registration window")]
    OutsideWindow { date: String, window_days: i64 },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    /// Safe wording for the requester. Schedule errors keep their own
    /// message because it quotes the user's input back to them.
    pub fn user_message(&self) -> String {
        match self {
            Self::BadRequest { message, .. } => message.clone(),
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly.".to_string()
            }
            Self::Internal { .. } => "An unexpected internal error occurred.".to_string(),
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Schedule(error) => Self::BadRequest {
                message: error.to_string(),
                correlation_id: "unassigned".to_string(),
            },
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_string() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_string() }
            }
        }
    }
}
