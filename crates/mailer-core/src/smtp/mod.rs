/// Minimal SMTP client: one message, one recipient, one connection
pub mod reply;
pub mod session;
pub mod transport;

pub use reply::SmtpReply;
pub use session::{Envelope, SmtpSession, SmtpState};
pub use transport::{BoxedStream, SmtpStream, connect};
