// SPDX-License-Identifier: GPL-3.0-only

//! Topic transport for depth arrays
//!
//! A [`Publisher`] accepts one [`DepthArray`] per loop iteration and hands it
//! to every subscriber of its topic. Each subscriber has a bounded queue; a
//! subscriber that falls behind loses its oldest pending messages and the
//! publisher never blocks.
//!
//! - [`bus::TopicBus`]: in-process topic
//! - [`tcp::TcpTopicServer`]: the same topic served to other processes
//! - [`wire`]: frame encoding used on TCP connections

pub mod bus;
pub mod tcp;
pub mod wire;

pub use bus::{Subscription, TopicBus};
pub use tcp::{TcpTopicClient, TcpTopicServer};

use crate::backends::camera::DepthGrid;
use crate::errors::TransportResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One axis of a multi-dimensional array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiArrayDimension {
    /// Axis name
    pub label: String,
    /// Number of elements along this axis
    pub size: u32,
    /// Elements spanned by one step along this axis, including inner axes
    pub stride: u32,
}

/// Shape of the flat data in a [`DepthArray`]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MultiArrayLayout {
    /// Axes from outermost to innermost
    pub dim: Vec<MultiArrayDimension>,
    /// Index of the first element in `data`
    pub data_offset: u32,
}

impl MultiArrayLayout {
    /// Row-major layout of a `height` x `width` grid
    pub fn row_major(width: u32, height: u32) -> Self {
        Self {
            dim: vec![
                MultiArrayDimension {
                    label: "height".to_string(),
                    size: height,
                    stride: height * width,
                },
                MultiArrayDimension {
                    label: "width".to_string(),
                    size: width,
                    stride: width,
                },
            ],
            data_offset: 0,
        }
    }
}

/// Depth values of one frame, flattened row-major
///
/// The publisher reuses one instance: every iteration clears it and refills
/// it from the current grid, so nothing of the previous frame survives.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthArray {
    /// Per-publisher sequence number, starting at 1
    pub seq: u64,
    /// When the frame was captured
    pub stamp: DateTime<Utc>,
    /// Shape of `data`
    pub layout: MultiArrayLayout,
    /// Depth values; index `row * width + col`
    pub data: Vec<f32>,
}

impl DepthArray {
    /// Empty message with room for `capacity` values
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seq: 0,
            stamp: Utc::now(),
            layout: MultiArrayLayout::default(),
            data: Vec::with_capacity(capacity),
        }
    }

    /// Replace the contents with a row-major copy of `grid`
    pub fn fill_from_grid(&mut self, grid: &DepthGrid, seq: u64, stamp: DateTime<Utc>) {
        self.data.clear();
        for row in grid.rows() {
            self.data.extend_from_slice(row);
        }
        self.layout = MultiArrayLayout::row_major(grid.width(), grid.height());
        self.seq = seq;
        self.stamp = stamp;
    }

    /// Width from the layout's innermost axis
    pub fn width(&self) -> u32 {
        self.layout.dim.last().map(|d| d.size).unwrap_or(0)
    }

    /// Height from the layout's outermost axis
    pub fn height(&self) -> u32 {
        match self.layout.dim.as_slice() {
            [outer, _] => outer.size,
            _ => 0,
        }
    }

    /// Value at `row`, `col` according to the layout
    pub fn at(&self, row: u32, col: u32) -> Option<f32> {
        if row >= self.height() || col >= self.width() {
            return None;
        }
        let index = self.layout.data_offset as usize
            + row as usize * self.width() as usize
            + col as usize;
        self.data.get(index).copied()
    }
}

/// Named output channel for depth arrays
pub trait Publisher: Send {
    /// Topic name
    fn topic(&self) -> &str;

    /// Queue `msg` for every current subscriber
    ///
    /// Having no subscriber is not an error; the message is simply dropped.
    fn publish(&mut self, msg: &DepthArray) -> TransportResult<()>;

    /// Number of subscribers currently attached
    fn subscriber_count(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_from_grid_row_major() {
        let grid = DepthGrid::from_vec(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let mut msg = DepthArray::with_capacity(6);
        msg.fill_from_grid(&grid, 7, Utc::now());

        assert_eq!(msg.data, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(msg.seq, 7);
        assert_eq!((msg.width(), msg.height()), (3, 2));
        assert_eq!(msg.layout.dim[0].stride, 6);
        assert_eq!(msg.at(1, 0), Some(4.0));
        assert_eq!(msg.at(2, 0), None);
    }

    #[test]
    fn test_fill_replaces_previous_contents() {
        let big = DepthGrid::from_vec(2, 2, vec![9.0; 4]).unwrap();
        let small = DepthGrid::from_vec(1, 1, vec![1.0]).unwrap();
        let mut msg = DepthArray::with_capacity(4);
        msg.fill_from_grid(&big, 1, Utc::now());
        msg.fill_from_grid(&small, 2, Utc::now());
        assert_eq!(msg.data, vec![1.0]);
    }
}
