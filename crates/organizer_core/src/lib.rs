pub mod domain;
pub mod ports;
pub mod reminder;

pub use domain::{
    Assignment, AssignmentStatus, NewAssignment, NewNote, Note, ReminderCandidate, User,
    UserCredentials,
};
pub use ports::{DatabaseService, MailService, PortError, PortResult};
pub use reminder::{ReminderPipeline, RunSummary, ScanWindow};
