// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for depth capture
//!
//! The backend layer hides how depth reaches the process, so the acquisition
//! loop works the same on real hardware and in simulation.
//!
//! # Modules
//!
//! - [`camera`]: Depth camera trait, device enumeration and frame capture

pub mod camera;
