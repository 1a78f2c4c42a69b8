use crate::corners::ChessCorner;
use crate::gridgraph::GridCorner;
use nalgebra::Point2;

/// Order a complete corner grid as board rows, board x axis fastest.
///
/// `inner` is the expected `(cols, rows)` inner corner count. The grid must
/// match it exactly, in either orientation, with every position filled;
/// anything else is a miss.
pub fn assemble_chessboard(
    corners: &[ChessCorner],
    grid: &[GridCorner],
    inner: (u32, u32),
) -> Option<Vec<Point2<f32>>> {
    let (cols, rows) = (inner.0 as i32, inner.1 as i32);
    let width = grid.iter().map(|c| c.i).max()? + 1;
    let height = grid.iter().map(|c| c.j).max()? + 1;
    if grid.len() != (cols * rows) as usize {
        log::debug!(
            "chessboard: grid has {} corners, expected {}",
            grid.len(),
            cols * rows
        );
        return None;
    }

    let transposed = if width == cols && height == rows {
        false
    } else if width == rows && height == cols {
        true
    } else {
        log::debug!("chessboard: grid {width}x{height} does not fit {cols}x{rows}");
        return None;
    };

    let mut slots: Vec<Option<Point2<f32>>> = vec![None; grid.len()];
    for c in grid {
        let (x, y) = if transposed { (c.j, c.i) } else { (c.i, c.j) };
        slots[(y * cols + x) as usize] = Some(corners[c.index].position);
    }
    slots.into_iter().collect()
}
