//! Shared test utilities for the KMA forecast workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic provider payloads (flat-grid text and portal JSON)
//! - Reference coordinates with their known grid cells
//! - Approximate float and grid cell assertions
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

/// Asserts that two floats differ by at most `epsilon`.
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(43.5000001, 43.5, 1e-6);
/// assert_approx_eq!(y2 - y1, 1.0, 0.05, "spacing at {} N", lat);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr $(,)?) => {
        $crate::assert_approx_eq!($left, $right, $epsilon, "values differ")
    };
    ($left:expr, $right:expr, $epsilon:expr, $($msg:tt)+) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        if (left - right).abs() > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`: {}\n  left: {:?}\n right: {:?}\n  diff: {:?} > {:?}",
                format_args!($($msg)+),
                left,
                right,
                (left - right).abs(),
                epsilon
            );
        }
    }};
}

/// Asserts that a grid cell has the expected column and row.
///
/// Accepts anything with public `x` and `y` fields.
#[macro_export]
macro_rules! assert_cell_eq {
    ($cell:expr, ($x:expr, $y:expr) $(,)?) => {{
        let cell = $cell;
        assert_eq!(
            (cell.x, cell.y),
            ($x, $y),
            "expected cell ({}, {}), got ({}, {})",
            $x,
            $y,
            cell.x,
            cell.y
        );
    }};
    ($cell:expr, ($x:expr, $y:expr), $($msg:tt)+) => {{
        let cell = $cell;
        assert_eq!((cell.x, cell.y), ($x, $y), $($msg)+);
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(-5.5, -5.500001, 0.0001);
    }

    #[test]
    #[should_panic(expected = "spacing")]
    fn test_assert_approx_eq_fails_with_message() {
        assert_approx_eq!(1.1, 1.0, 0.001, "spacing at {} N", 37);
    }

    #[test]
    fn test_assert_cell_eq() {
        struct Cell {
            x: i32,
            y: i32,
        }
        assert_cell_eq!(Cell { x: 60, y: 127 }, (60, 127));
    }

    #[test]
    fn test_flat_payload_has_trailing_grid() {
        let grid = create_index_grid(3, 2);
        let payload = flat_grid_payload(&grid, 2);
        let tokens: Vec<&str> = payload
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty() && !t.starts_with('='))
            .collect();
        assert_eq!(tokens.len(), 6);
    }
}
