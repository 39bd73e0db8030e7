//! Operator commands: image upload and feed republishing.

pub mod publish;
pub mod upload;
