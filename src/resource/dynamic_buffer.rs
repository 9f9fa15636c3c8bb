//! Dynamic uniform buffer for per-mesh and per-light data.
//!
//! Every mesh part and every light of a frame pushes its uniforms here, and the
//! whole frame is uploaded with a single `write_buffer` call. Draws then select
//! their entry through a dynamic bind group offset.

use crate::context::Context;
use bytemuck::Pod;
use std::mem;

/// Frame-scoped uniform storage addressed with dynamic offsets.
///
/// Each entry is aligned to the device's minimum uniform buffer offset alignment.
///
/// ```ignore
/// let mut models = DynamicUniformBuffer::<ModelUniforms>::new(&ctxt, "model_uniforms");
///
/// models.clear();
/// let offsets: Vec<u32> = parts.iter().map(|p| models.push(&p.uniforms())).collect();
/// if models.flush() {
///     // the buffer was reallocated: rebuild the bind group
/// }
/// ```
pub struct DynamicUniformBuffer<T: Pod> {
    ctxt: Context,
    // Entries of the current frame, already padded.
    data: Vec<u8>,
    buffer: wgpu::Buffer,
    capacity: u64,
    aligned_size: u64,
    count: usize,
    label: &'static str,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Pod> DynamicUniformBuffer<T> {
    /// Creates a buffer with room for 64 entries.
    pub fn new(ctxt: &Context, label: &'static str) -> Self {
        Self::with_capacity(ctxt, label, 64)
    }

    /// Creates a buffer with room for `initial_capacity` entries.
    pub fn with_capacity(ctxt: &Context, label: &'static str, initial_capacity: usize) -> Self {
        let alignment = ctxt.device.limits().min_uniform_buffer_offset_alignment as u64;

        let aligned_size = aligned_entry_size(mem::size_of::<T>() as u64, alignment);

        let capacity = aligned_size * initial_capacity.max(1) as u64;

        let buffer = ctxt.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            ctxt: ctxt.clone(),
            data: Vec::with_capacity(capacity as usize),
            buffer,
            capacity,
            aligned_size,
            count: 0,
            label,
            _marker: std::marker::PhantomData,
        }
    }

    /// Returns the aligned size of each entry.
    #[inline]
    pub fn aligned_size(&self) -> u64 {
        self.aligned_size
    }

    /// Returns the number of entries currently in the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true if the buffer contains no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Clears the buffer for the next frame.
    ///
    /// This resets the CPU-side data but doesn't deallocate memory.
    pub fn clear(&mut self) {
        self.data.clear();
        self.count = 0;
    }

    /// Pushes an entry and returns its byte offset, to be used as a dynamic offset.
    ///
    /// `flush()` must be called after the last push and before the draws.
    pub fn push(&mut self, value: &T) -> u32 {
        let offset = (self.count as u64 * self.aligned_size) as u32;

        // Write the actual data
        let bytes = bytemuck::bytes_of(value);
        self.data.extend_from_slice(bytes);

        // Pad to alignment
        let padding = self.aligned_size as usize - bytes.len();
        self.data.extend(std::iter::repeat_n(0u8, padding));

        self.count += 1;
        offset
    }

    /// Uploads the frame's entries, growing the GPU buffer if needed.
    ///
    /// Returns `true` if the buffer was reallocated: bind groups referencing it
    /// must be recreated.
    pub fn flush(&mut self) -> bool {
        if self.data.is_empty() {
            return false;
        }

        let required_size = self.data.len() as u64;

        // Grow buffer if needed
        let reallocated = if required_size > self.capacity {
            self.grow(required_size);
            true
        } else {
            false
        };

        self.ctxt.write_buffer(&self.buffer, 0, &self.data);

        reallocated
    }

    /// Grows the GPU buffer to accommodate the required size.
    fn grow(&mut self, required_size: u64) {
        // Double capacity until it's enough
        let mut new_capacity = self.capacity;
        while new_capacity < required_size {
            new_capacity *= 2;
        }

        log::debug!("growing '{}' to {} bytes", self.label, new_capacity);
        self.buffer = self.ctxt.create_buffer(&wgpu::BufferDescriptor {
            label: Some(self.label),
            size: new_capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.capacity = new_capacity;
    }

    /// Returns a reference to the underlying GPU buffer.
    #[inline]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Size of one entry as seen by the shader.
    #[inline]
    pub fn binding_size() -> wgpu::BufferSize {
        wgpu::BufferSize::new(mem::size_of::<T>() as u64).unwrap_or(wgpu::BufferSize::MIN)
    }
}

/// Size of an entry of `size` bytes once padded to `alignment`.
pub fn aligned_entry_size(size: u64, alignment: u64) -> u64 {
    size.max(1).div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::aligned_entry_size;

    #[test]
    fn entries_are_padded_to_the_offset_alignment() {
        assert_eq!(aligned_entry_size(64, 256), 256);
        assert_eq!(aligned_entry_size(256, 256), 256);
        assert_eq!(aligned_entry_size(400, 256), 512);
        assert_eq!(aligned_entry_size(0, 256), 256);
    }
}
