//! Growable GPU vertex buffers
//!
//! Buffers grow geometrically to the next power of two at or above the
//! required size (minimum 4 B) and are replaced, never resized in place.
//! Upload planning is separated from submission so the cursor arithmetic is
//! testable without a device.

/// How a pending upload should hit the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPlan {
    /// New capacity to allocate first, if the current buffer is too small.
    pub grow_to: Option<u64>,
    /// Byte offset the write starts at.
    pub write_offset: u64,
    /// Whether the full range `[0, total_bytes)` must be written instead of
    /// just the appended suffix.
    pub full_reupload: bool,
}

impl UploadPlan {
    /// Plans an upload of `total_bytes` where the first `cursor_bytes` are
    /// already resident in a buffer of `capacity_bytes` (0 when absent).
    pub fn for_append(capacity_bytes: u64, cursor_bytes: u64, total_bytes: u64) -> Self {
        debug_assert!(cursor_bytes <= total_bytes);
        if capacity_bytes >= total_bytes && capacity_bytes > 0 {
            UploadPlan {
                grow_to: None,
                write_offset: cursor_bytes,
                full_reupload: false,
            }
        } else {
            UploadPlan {
                grow_to: Some(required_capacity(total_bytes)),
                write_offset: 0,
                full_reupload: true,
            }
        }
    }

    /// Plans a full replacement upload of `total_bytes`.
    pub fn for_replace(capacity_bytes: u64, total_bytes: u64) -> Self {
        let grow_to = if capacity_bytes >= total_bytes && capacity_bytes > 0 {
            None
        } else {
            Some(required_capacity(total_bytes))
        };
        UploadPlan {
            grow_to,
            write_offset: 0,
            full_reupload: true,
        }
    }
}

/// Next power of two at or above `bytes`, minimum 4 B.
pub fn required_capacity(bytes: u64) -> u64 {
    bytes.next_power_of_two().max(4)
}

/// A vertex buffer that grows geometrically and tracks its used range.
pub struct GrowableBuffer {
    buffer: Option<wgpu::Buffer>,
    capacity_bytes: u64,
    used_bytes: u64,
    usage: wgpu::BufferUsages,
    label: String,
}

impl GrowableBuffer {
    pub fn new(usage: wgpu::BufferUsages, label: impl Into<String>) -> Self {
        Self {
            buffer: None,
            capacity_bytes: 0,
            used_bytes: 0,
            usage,
            label: label.into(),
        }
    }

    /// Vertex-usage buffer that can also be bound as storage, so compute
    /// renderers (scatter density) can bin the same points.
    pub fn vertex(label: impl Into<String>) -> Self {
        Self::new(
            wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST,
            label,
        )
    }

    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffer.as_ref()
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    pub fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    /// Executes a planned upload. `all_bytes` is the complete logical range;
    /// incremental plans write only the suffix from `write_offset`.
    pub fn apply(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        plan: UploadPlan,
        all_bytes: &[u8],
    ) {
        if let Some(new_capacity) = plan.grow_to {
            log::debug!(
                "{}: growing {} -> {} bytes",
                self.label,
                self.capacity_bytes,
                new_capacity
            );
            let new_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&self.label),
                size: new_capacity,
                usage: self.usage,
                mapped_at_creation: false,
            });
            if let Some(old) = self.buffer.replace(new_buffer) {
                old.destroy();
            }
            self.capacity_bytes = new_capacity;
        }

        let Some(buffer) = self.buffer.as_ref() else {
            return;
        };

        let write = if plan.full_reupload {
            all_bytes
        } else {
            &all_bytes[plan.write_offset as usize..]
        };
        if !write.is_empty() {
            queue.write_buffer(buffer, plan.write_offset, write);
        }
        self.used_bytes = all_bytes.len() as u64;
    }

    pub fn destroy(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            buffer.destroy();
        }
        self.capacity_bytes = 0;
        self.used_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_capacity_is_power_of_two() {
        assert_eq!(required_capacity(0), 4);
        assert_eq!(required_capacity(3), 4);
        assert_eq!(required_capacity(4), 4);
        assert_eq!(required_capacity(5), 8);
        assert_eq!(required_capacity(1000), 1024);
        assert_eq!(required_capacity(1024 * 1024 + 1), 2 * 1024 * 1024);
    }

    #[test]
    fn test_append_within_capacity_is_incremental() {
        let plan = UploadPlan::for_append(1024, 240, 320);
        assert_eq!(plan.grow_to, None);
        assert_eq!(plan.write_offset, 240);
        assert!(!plan.full_reupload);
    }

    #[test]
    fn test_append_beyond_capacity_grows_and_reuploads() {
        let plan = UploadPlan::for_append(256, 240, 320);
        assert_eq!(plan.grow_to, Some(512));
        assert_eq!(plan.write_offset, 0);
        assert!(plan.full_reupload);
    }

    #[test]
    fn test_first_upload_always_allocates() {
        let plan = UploadPlan::for_append(0, 0, 24);
        assert_eq!(plan.grow_to, Some(32));
        assert!(plan.full_reupload);
    }

    #[test]
    fn test_replace_reuses_large_enough_buffer() {
        let plan = UploadPlan::for_replace(1024, 512);
        assert_eq!(plan.grow_to, None);
        assert!(plan.full_reupload);
        assert_eq!(plan.write_offset, 0);
    }
}
