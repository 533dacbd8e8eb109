//! wgpu Context
//!
//! The [`GraphicsContext`] holds the core GPU handles (device, queue) and
//! verifies that the adapter can host the deferred pipeline's G-buffer.
//! Window surfaces belong to the embedding application; the renderer only
//! ever draws into its own textures.

use crate::errors::{OdysseyError, Result};
use crate::renderer::pipeline::attachments::GBUFFER_FORMATS;

/// Color targets bound at once by the G-buffer pass.
pub const GBUFFER_TARGET_COUNT: u32 = GBUFFER_FORMATS.len() as u32;

/// Core wgpu context holding GPU handles.
pub struct GraphicsContext {
    /// The wgpu device for GPU operations
    pub device: wgpu::Device,
    /// The command queue for submitting work
    pub queue: wgpu::Queue,
    /// Adapter description, for logs and diagnostics
    pub adapter_info: wgpu::AdapterInfo,
}

impl GraphicsContext {
    /// Creates a context without a surface.
    pub async fn new_headless() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| OdysseyError::AdapterRequestFailed("no compatible adapter found".to_string()))?;

        Self::from_adapter(&adapter).await
    }

    /// Creates the device on an adapter chosen by the embedding application.
    pub async fn from_adapter(adapter: &wgpu::Adapter) -> Result<Self> {
        let adapter_info = adapter.get_info();
        let limits = adapter.limits();
        Self::check_capabilities(&limits)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Odyssey Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits,
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        log::info!(
            "Graphics context ready: {} ({:?}, {:?})",
            adapter_info.name,
            adapter_info.backend,
            adapter_info.device_type
        );

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }

    /// Fails with [`OdysseyError::MissingCapability`] when the limits cannot
    /// hold the G-buffer MRT.
    pub fn check_capabilities(limits: &wgpu::Limits) -> Result<()> {
        if limits.max_color_attachments < GBUFFER_TARGET_COUNT {
            log::error!("Adapter supports only {} color attachments", limits.max_color_attachments);
            return Err(OdysseyError::MissingCapability {
                capability: "max_color_attachments",
                required: GBUFFER_TARGET_COUNT,
                available: limits.max_color_attachments,
            });
        }
        let required = gbuffer_bytes_per_sample();
        if limits.max_color_attachment_bytes_per_sample < required {
            log::error!(
                "Adapter supports only {} color attachment bytes per sample",
                limits.max_color_attachment_bytes_per_sample
            );
            return Err(OdysseyError::MissingCapability {
                capability: "max_color_attachment_bytes_per_sample",
                required,
                available: limits.max_color_attachment_bytes_per_sample,
            });
        }
        Ok(())
    }

    /// Runs `f` inside a validation error scope and converts a captured
    /// error into [`OdysseyError::GpuValidation`].
    pub fn scoped_validation<T>(&self, label: &str, f: impl FnOnce(&wgpu::Device) -> T) -> Result<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => {
                log::error!("{label}: {error}");
                Err(OdysseyError::GpuValidation {
                    label: label.to_string(),
                    message: error.to_string(),
                })
            }
            None => Ok(value),
        }
    }

    /// Reads a 4-byte-per-pixel texture back as tightly packed rows.
    pub fn read_texture_rgba8(&self, texture: &wgpu::Texture) -> Result<Vec<u8>> {
        let width = texture.width();
        let height = texture.height();
        let bytes_per_pixel = 4u32;
        let unpadded_bytes_per_row = width * bytes_per_pixel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Pixel Readback Buffer"),
            size: u64::from(padded_bytes_per_row) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &staging_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|e| OdysseyError::BufferReadFailed(e.to_string()))?
            .map_err(|e| OdysseyError::BufferReadFailed(e.to_string()))?;

        let data = buffer_slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((unpadded_bytes_per_row * height) as usize);
        for row in 0..height {
            let start = (row * padded_bytes_per_row) as usize;
            pixels.extend_from_slice(&data[start..start + unpadded_bytes_per_row as usize]);
        }
        drop(data);
        staging_buffer.unmap();

        Ok(pixels)
    }
}

/// Attachment bytes per sample of the G-buffer MRT, counted the way wgpu
/// validates them (each target aligned to its component size).
#[must_use]
pub fn gbuffer_bytes_per_sample() -> u32 {
    GBUFFER_FORMATS.iter().fold(0u32, |total, format| {
        let cost = format.target_pixel_byte_cost().unwrap_or(0);
        let align = format.target_component_alignment().unwrap_or(1).max(1);
        total.div_ceil(align) * align + cost
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gbuffer_cost_exceeds_default_limit() {
        assert_eq!(gbuffer_bytes_per_sample(), 50);
        assert!(GraphicsContext::check_capabilities(&wgpu::Limits::default()).is_err());
    }

    #[test]
    fn generous_limits_pass() {
        let limits = wgpu::Limits {
            max_color_attachment_bytes_per_sample: 128,
            ..wgpu::Limits::default()
        };
        assert!(GraphicsContext::check_capabilities(&limits).is_ok());
    }
}
