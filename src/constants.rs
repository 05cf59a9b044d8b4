//! Global constants for the posemark editor

use std::time::Duration;

/// Minimum drawn box width/height, in display pixels.
pub const MIN_BOX_SIZE_PX: f64 = 5.0;

/// Half-size of the square hit area around a box corner handle, in display pixels.
pub const HANDLE_HIT_RADIUS_PX: f64 = 10.0;

/// Hit radius for keypoint selection, in display pixels.
pub const KEYPOINT_HIT_RADIUS_PX: f64 = 8.0;

/// Number of store snapshots retained by the undo history.
pub const HISTORY_LIMIT: usize = 50;

/// Quiet period after the last edit before annotations are saved.
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Label given to newly placed keypoints.
pub const DEFAULT_KEYPOINT_LABEL: &str = "Keypoint";

/// Default backend root.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000/api";
