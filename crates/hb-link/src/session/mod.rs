//! Hardware session management

mod collaborator;
mod manager;
mod tick;

#[cfg(test)]
pub(crate) mod testing;

pub use collaborator::{Collaborator, TracingCollaborator};
pub use manager::{Detection, HwSession, CONNECT_FAIL_MESSAGE, HW_TITLE};
