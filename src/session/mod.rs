pub mod authenticator;
pub mod pagination;
pub mod session;

pub use authenticator::Authenticator;
pub use pagination::{fetch_all, PagedResult};
pub use session::{Session, SessionSettings};
