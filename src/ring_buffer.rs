//! Fixed-capacity stereo capture ring.
//!
//! Storage is reserved once, up front. `push` runs on the audio thread and
//! never allocates; reading (`drain`, `read_into`, `drain_chunks`) belongs to
//! the control context and requires exclusive access, so the borrow checker
//! keeps it off the audio thread while that thread holds the store.

use crate::error::RecorderError;

/// Compute the ring capacity in frames for a sample rate and duration.
pub fn capacity_for(sample_rate: f64, max_duration_secs: u64) -> Result<usize, RecorderError> {
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(RecorderError::Config(format!(
            "Invalid sample rate: {}",
            sample_rate
        )));
    }

    let frames = (sample_rate * max_duration_secs as f64).floor();
    if frames < 1.0 {
        return Err(RecorderError::Config(format!(
            "Ring capacity is zero for {} Hz over {} seconds",
            sample_rate, max_duration_secs
        )));
    }
    if frames > usize::MAX as f64 {
        return Err(RecorderError::Allocation {
            frames: usize::MAX,
        });
    }

    Ok(frames as usize)
}

/// Two parallel sample arrays (left/right) sharing one cursor pair.
pub struct RingBufferStore {
    left: Box<[f32]>,
    right: Box<[f32]>,
    write_cursor: usize,
    read_cursor: usize,
    /// Frames written but not yet read. Distinguishes full from empty, since
    /// the cursors coincide in both cases.
    unread: usize,
}

/// Reserve `capacity` zeroed samples, reporting failure instead of aborting.
fn zeroed_channel(capacity: usize) -> Result<Box<[f32]>, RecorderError> {
    let mut samples: Vec<f32> = Vec::new();
    samples
        .try_reserve_exact(capacity)
        .map_err(|_| RecorderError::Allocation { frames: capacity })?;
    samples.resize(capacity, 0.0);
    Ok(samples.into_boxed_slice())
}

impl RingBufferStore {
    /// Allocate zero-filled storage for `capacity` frames on each channel.
    pub fn new(capacity: usize) -> Result<Self, RecorderError> {
        if capacity == 0 {
            return Err(RecorderError::Config(
                "Ring capacity must be at least one frame".to_string(),
            ));
        }

        Ok(RingBufferStore {
            left: zeroed_channel(capacity)?,
            right: zeroed_channel(capacity)?,
            write_cursor: 0,
            read_cursor: 0,
            unread: 0,
        })
    }

    /// Rewind both cursors. Stored samples are left in place.
    pub fn reset(&mut self) {
        self.write_cursor = 0;
        self.read_cursor = 0;
        self.unread = 0;
    }

    /// Store one stereo frame. Returns `true` when the ring was full and the
    /// oldest unread frame was overwritten.
    #[inline]
    pub fn push(&mut self, left: f32, right: f32) -> bool {
        let capacity = self.left.len();
        let overrun = self.unread == capacity;

        self.left[self.write_cursor] = left;
        self.right[self.write_cursor] = right;
        self.write_cursor = (self.write_cursor + 1) % capacity;

        if overrun {
            self.read_cursor = (self.read_cursor + 1) % capacity;
        } else {
            self.unread += 1;
        }

        overrun
    }

    /// Copy up to `min(left.len(), right.len())` unread frames out, oldest
    /// first, advancing the read cursor. Returns the number of frames copied.
    pub fn read_into(&mut self, left: &mut [f32], right: &mut [f32]) -> usize {
        let wanted = left.len().min(right.len()).min(self.unread);
        let mut copied = 0;

        while copied < wanted {
            let (first_l, first_r) = self.contiguous_unread();
            let n = first_l.len().min(wanted - copied);
            left[copied..copied + n].copy_from_slice(&first_l[..n]);
            right[copied..copied + n].copy_from_slice(&first_r[..n]);
            self.advance_read(n);
            copied += n;
        }

        copied
    }

    /// Read up to `max_frames` unread frames into freshly allocated vectors.
    pub fn drain(&mut self, max_frames: usize) -> (Vec<f32>, Vec<f32>) {
        let n = max_frames.min(self.unread);
        let mut left = vec![0.0; n];
        let mut right = vec![0.0; n];
        let copied = self.read_into(&mut left, &mut right);
        debug_assert_eq!(copied, n);
        (left, right)
    }

    /// Hand up to `max_frames` unread frames to `f` as borrowed slices, in at
    /// most two contiguous pieces, then advance the read cursor past them.
    ///
    /// If `f` fails, the frames it was given are still considered read.
    pub fn drain_chunks<E, F>(&mut self, max_frames: usize, mut f: F) -> Result<usize, E>
    where
        F: FnMut(&[f32], &[f32]) -> Result<(), E>,
    {
        let wanted = max_frames.min(self.unread);
        let mut handed = 0;

        while handed < wanted {
            let (first_l, first_r) = self.contiguous_unread();
            let n = first_l.len().min(wanted - handed);
            let result = f(&first_l[..n], &first_r[..n]);
            self.advance_read(n);
            handed += n;
            result?;
        }

        Ok(handed)
    }

    /// Discard the `frames` oldest unread frames.
    pub fn skip(&mut self, frames: usize) -> usize {
        let n = frames.min(self.unread);
        self.advance_read(n);
        n
    }

    /// The unread region starting at the read cursor, up to the end of storage.
    fn contiguous_unread(&self) -> (&[f32], &[f32]) {
        let end = (self.read_cursor + self.unread).min(self.left.len());
        (
            &self.left[self.read_cursor..end],
            &self.right[self.read_cursor..end],
        )
    }

    fn advance_read(&mut self, frames: usize) {
        debug_assert!(frames <= self.unread);
        self.read_cursor = (self.read_cursor + frames) % self.left.len();
        self.unread -= frames;
    }

    pub fn capacity(&self) -> usize {
        self.left.len()
    }

    pub fn unread(&self) -> usize {
        self.unread
    }

    pub fn is_empty(&self) -> bool {
        self.unread == 0
    }

    pub fn is_full(&self) -> bool {
        self.unread == self.left.len()
    }

    pub fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    pub fn read_cursor(&self) -> usize {
        self.read_cursor
    }

    /// Raw left-channel storage, in slot order.
    pub fn left(&self) -> &[f32] {
        &self.left
    }

    /// Raw right-channel storage, in slot order.
    pub fn right(&self) -> &[f32] {
        &self.right
    }
}

impl std::fmt::Debug for RingBufferStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBufferStore")
            .field("capacity", &self.capacity())
            .field("write_cursor", &self.write_cursor)
            .field("read_cursor", &self.read_cursor)
            .field("unread", &self.unread)
            .finish()
    }
}
