//! Shared-memory image-stream abstraction (spec.md §6.1, §9).
//!
//! The real transport — a POSIX shared-memory segment plus named
//! semaphores — is a deliberately out-of-scope external collaborator; the
//! core pipeline depends only on the narrow interface captured here:
//! typed, named streams with a scoped write fence
//! ([`SharedImage::begin_write`]) and per-reader semaphore readiness
//! ([`SharedImage::sem_wait`]/[`sem_trywait`](SharedImage::sem_trywait)/
//! [`sem_drain`](SharedImage::sem_drain)).

mod errors;
mod registry;
mod semaphore;
mod shared_image;

pub use errors::{Error, Result};
pub use registry::LocalStreamPort;
pub use semaphore::Semaphore;
pub use shared_image::{SharedImage, WriteGuard};
