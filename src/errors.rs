//! Error Types
//!
//! This module defines the error types used throughout the renderer.
//!
//! # Overview
//!
//! The main error type [`OdysseyError`] covers the fatal failure modes of the
//! rendering core:
//! - GPU initialization failures and missing device capabilities
//! - Shader template rendering and compilation errors
//! - Configuration and asset validation errors
//!
//! Missing optional resources (an unknown texture, an unresolved bone) are
//! not errors: they are logged and replaced by neutral defaults.
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, OdysseyError>`.
//!
//! ```rust,ignore
//! use odyssey::errors::Result;
//!
//! fn init() -> Result<GraphicsContext> {
//!     pollster::block_on(GraphicsContext::new_headless())
//! }
//! ```

use thiserror::Error;

/// The main error type for the renderer.
#[derive(Error, Debug)]
pub enum OdysseyError {
    // ========================================================================
    // GPU & Rendering Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// The adapter lacks a capability the deferred pipeline requires.
    #[error("Missing GPU capability: {capability} (required {required}, available {available})")]
    MissingCapability {
        /// Name of the limit or feature
        capability: &'static str,
        /// Minimum value the pipeline needs
        required: u32,
        /// Value reported by the adapter
        available: u32,
    },

    /// A validation error captured from a wgpu error scope.
    #[error("GPU validation error in {label}: {message}")]
    GpuValidation {
        /// Label of the scoped operation
        label: String,
        /// Message reported by wgpu
        message: String,
    },

    /// The requested render resolution cannot back an attachment set.
    #[error("Invalid render resolution {width}x{height}")]
    InvalidResolution {
        /// Requested width in pixels
        width: u32,
        /// Requested height in pixels
        height: u32,
    },

    /// Reading a GPU buffer back to the CPU failed.
    #[error("Buffer readback failed: {0}")]
    BufferReadFailed(String),

    // ========================================================================
    // Shader Errors
    // ========================================================================
    /// Template rendering error (unknown template, bad syntax).
    #[error("Shader template error: {0}")]
    ShaderTemplate(#[from] minijinja::Error),

    /// The generated WGSL was rejected by the device.
    #[error("Shader compilation failed for '{name}': {message}")]
    ShaderCompilation {
        /// Template name the module was generated from
        name: String,
        /// Compiler diagnostics
        message: String,
    },

    // ========================================================================
    // Asset & Configuration Errors
    // ========================================================================
    /// Decoded asset data is inconsistent (size mismatch, bad layout).
    #[error("Invalid asset '{name}': {reason}")]
    InvalidAsset {
        /// Asset name
        name: String,
        /// What was wrong
        reason: String,
    },

    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Alias for `Result<T, OdysseyError>`.
pub type Result<T> = std::result::Result<T, OdysseyError>;
