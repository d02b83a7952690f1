use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::errors::{Error, Result};
use crate::semaphore::Semaphore;

/// A typed, named shared image stream: spec.md §6.1's `{size[0], size[1],
/// dtype, write, cnt0, cnt1}` metadata plus payload, and the set of
/// semaphores subscribed to it. `T` stands in for the stream's `dtype`
/// (`u16` raw frames, `u8` masks, `f32` backgrounds/LUTs/maps/vectors).
///
/// There is exactly one writer per stream (single-writer discipline,
/// spec.md §5); readers call [`SharedImage::sem_wait`]/
/// [`SharedImage::sem_trywait`] on their own [`SharedImage::get_wait_index`]
/// slot before calling [`SharedImage::read`].
pub struct SharedImage<T> {
    name: String,
    width: usize,
    height: usize,
    payload: RwLock<Vec<T>>,
    write_in_progress: AtomicBool,
    cnt0: AtomicU64,
    cnt1: AtomicU64,
    semaphores: Mutex<Vec<Arc<Semaphore>>>,
}

impl<T: Clone> SharedImage<T> {
    pub fn new(name: impl Into<String>, width: usize, height: usize, fill: T) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            payload: RwLock::new(vec![fill; width * height]),
            write_in_progress: AtomicBool::new(false),
            cnt0: AtomicU64::new(0),
            cnt1: AtomicU64::new(0),
            semaphores: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn is_write_in_progress(&self) -> bool {
        self.write_in_progress.load(Ordering::SeqCst)
    }

    pub fn cnt0(&self) -> u64 {
        self.cnt0.load(Ordering::SeqCst)
    }

    pub fn cnt1(&self) -> u64 {
        self.cnt1.load(Ordering::SeqCst)
    }

    /// Allocate a semaphore slot exclusively owned by the caller (spec.md
    /// §6.1 `get_wait_index`).
    pub fn get_wait_index(&self) -> usize {
        let mut sems = self.semaphores.lock().unwrap();
        sems.push(Arc::new(Semaphore::new()));
        sems.len() - 1
    }

    fn semaphore_at(&self, idx: usize) -> Result<Arc<Semaphore>> {
        let sems = self.semaphores.lock().unwrap();
        sems.get(idx)
            .cloned()
            .ok_or(Error::InvalidWaitIndex(idx, sems.len()))
    }

    pub fn sem_wait(&self, idx: usize) -> Result<()> {
        // Clone the Arc and drop the registry lock before a potentially
        // long block, so other readers can still register/wait on their
        // own slots concurrently.
        let sem = self.semaphore_at(idx)?;
        sem.wait(&self.name)
    }

    pub fn sem_trywait(&self, idx: usize) -> Result<bool> {
        let sem = self.semaphore_at(idx)?;
        Ok(sem.trywait())
    }

    pub fn sem_drain(&self, idx: usize) -> Result<()> {
        let sem = self.semaphore_at(idx)?;
        sem.drain();
        Ok(())
    }

    /// A consistent snapshot of the payload. Guaranteed valid for a reader
    /// that has just returned from `sem_wait`/`sem_trywait` on its slot
    /// (spec.md §6.1 guarantee).
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.payload.read().unwrap()
    }

    /// Enter the write-fence scope. Exiting the returned guard (drop)
    /// performs `end_write`: advances `cnt0`/`cnt1` and posts every
    /// subscribed semaphore (spec.md §6.1, §9 "scoped acquisition").
    pub fn begin_write(&self) -> WriteGuard<'_, T> {
        self.write_in_progress.store(true, Ordering::SeqCst);
        WriteGuard {
            image: self,
            guard: self.payload.write().unwrap(),
        }
    }
}

pub struct WriteGuard<'a, T> {
    image: &'a SharedImage<T>,
    guard: RwLockWriteGuard<'a, Vec<T>>,
}

impl<T> std::ops::Deref for WriteGuard<'_, T> {
    type Target = [T];
    fn deref(&self) -> &[T] {
        &self.guard
    }
}

impl<T> std::ops::DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.guard
    }
}

impl<T> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        self.image.cnt0.fetch_add(1, Ordering::SeqCst);
        self.image.cnt1.fetch_add(1, Ordering::SeqCst);
        self.image.write_in_progress.store(false, Ordering::SeqCst);
        for sem in self.image.semaphores.lock().unwrap().iter() {
            sem.post();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_wait_observes_data_and_advances_counters() {
        let img = SharedImage::<f32>::new("test", 2, 2, 0.0f32);
        let idx = img.get_wait_index();
        assert!(!img.sem_trywait(idx).unwrap());

        {
            let mut w = img.begin_write();
            w[0] = 42.0;
        }

        assert!(img.sem_trywait(idx).unwrap());
        assert_eq!(img.cnt1(), 1);
        assert_eq!(img.read()[0], 42.0);
    }

    #[test]
    fn multiple_readers_each_get_their_own_posts() {
        let img = SharedImage::<u16>::new("test", 1, 1, 0u16);
        let r1 = img.get_wait_index();
        let r2 = img.get_wait_index();
        {
            let mut w = img.begin_write();
            w[0] = 7;
        }
        assert!(img.sem_trywait(r1).unwrap());
        assert!(img.sem_trywait(r2).unwrap());
    }

    #[test]
    fn drain_swallows_stale_readiness() {
        let img = SharedImage::<u8>::new("test", 1, 1, 0u8);
        let idx = img.get_wait_index();
        {
            let _w = img.begin_write();
        }
        {
            let _w = img.begin_write();
        }
        img.sem_drain(idx).unwrap();
        assert!(!img.sem_trywait(idx).unwrap());
    }
}
