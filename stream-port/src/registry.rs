use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::errors::{Error, Result};
use crate::shared_image::SharedImage;

/// An in-process stand-in for the shared-memory image-stream transport of
/// spec.md §6.1. The real transport (a POSIX shared-memory segment with
/// named semaphores) is a deliberately out-of-scope external collaborator;
/// this registry implements the same `open`/`create` contract against
/// process-local [`SharedImage`]s so the core components and their tests
/// can run without any IPC primitive at all.
#[derive(Default)]
pub struct LocalStreamPort {
    streams: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl LocalStreamPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a stream that must already exist (spec.md §6.1 `open`).
    pub fn open<T: 'static + Send + Sync>(&self, name: &str) -> Result<Arc<SharedImage<T>>> {
        let streams = self.streams.lock().unwrap();
        let entry = streams.get(name).ok_or_else(|| Error::NotFound(name.to_string()))?;
        entry
            .clone()
            .downcast::<SharedImage<T>>()
            .map_err(|_| Error::NotFound(name.to_string()))
    }

    /// Open a stream, or create it with the given shape if absent.
    /// Idempotent if a compatible stream already exists (spec.md §6.1
    /// `create`): an existing stream with a matching shape is returned
    /// as-is, a mismatched shape is an error.
    pub fn create<T: 'static + Clone + Send + Sync>(
        &self,
        name: &str,
        width: usize,
        height: usize,
        fill: T,
    ) -> Result<Arc<SharedImage<T>>> {
        let mut streams = self.streams.lock().unwrap();
        if let Some(entry) = streams.get(name) {
            let existing = entry
                .clone()
                .downcast::<SharedImage<T>>()
                .map_err(|_| Error::NotFound(name.to_string()))?;
            if existing.shape() != (width, height) {
                return Err(Error::ShapeMismatch {
                    name: name.to_string(),
                    existing: existing.shape(),
                    requested: (width, height),
                });
            }
            return Ok(existing);
        }
        let created = Arc::new(SharedImage::new(name.to_string(), width, height, fill));
        streams.insert(name.to_string(), created.clone());
        Ok(created)
    }
}
