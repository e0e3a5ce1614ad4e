pub mod discovery;
pub mod issuer;
