//! Real-time video pipeline for one-to-one calls.
//!
//! callvideo captures the local camera, hardware-encodes it to H.264 and hands
//! start-code payloads to a native application core for transport. In the other
//! direction it decodes the peer's payloads and keeps the latest remote image
//! ready for display, clearing it when the peer goes quiet.
//!
//! # Features
//!
//! - **Call-state driven**: one `sync_with_call_state` call reconciles capture and decode
//! - **Bit-exact framing**: length-prefixed encoder output to start-code form,
//!   SPS/PPS in front of every key frame
//! - **Degrades, never fails**: a missing camera or encoder leaves the rest running
//! - **Platform neutral**: cameras, encoders and decoders are traits
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use callvideo::{CallState, MediaPlatform, PipelineConfig, VideoCallPipeline};
//! use callvideo::boundary::CoreBoundary;
//! use std::sync::Arc;
//!
//! # fn platform() -> MediaPlatform { unimplemented!() }
//! # fn core() -> Arc<dyn CoreBoundary> { unimplemented!() }
//! #[tokio::main]
//! async fn main() -> callvideo::Result<()> {
//!     callvideo::logging::init_logging("callvideo=info");
//!     let config = PipelineConfig::from_path("pipeline.yaml")?;
//!
//!     let mut pipeline = VideoCallPipeline::new(platform(), config);
//!     pipeline.configure(core());
//!
//!     // Whenever the call changes:
//!     pipeline.sync_with_call_state(Some(&CallState::live_video(true)));
//!
//!     if let Some(remote) = pipeline.remote_frame() {
//!         println!("Remote frame {}x{}", remote.frame.width, remote.frame.height);
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Framing and collaborator seams
pub mod bitstream;
pub mod boundary;
pub mod platform;

// Media paths
pub mod capture;
pub mod decode;
pub mod pipeline;

// Ambient
pub mod config;
pub mod logging;

// Core exports
pub use error::*;
pub use types::*;

// Main API exports
pub use boundary::{CoreBoundary, VideoFrameReceiver};
pub use capture::CaptureSession;
pub use config::PipelineConfig;
pub use decode::DecodeSink;
pub use pipeline::{RemoteFrame, VideoCallPipeline};
pub use platform::MediaPlatform;
