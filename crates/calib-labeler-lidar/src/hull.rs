//! 2D convex hull over projected plane points.

use nalgebra::Point2;

const CROSS_EPS: f64 = 1e-12;

#[inline]
fn cross(o: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Indices of the points on the convex hull, counter-clockwise from the
/// lowest-x point. Points lying on hull edges are kept; each index appears
/// once.
pub fn convex_hull_indices(points: &[Point2<f64>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| {
        points[a]
            .x
            .total_cmp(&points[b].x)
            .then(points[a].y.total_cmp(&points[b].y))
    });
    if order.len() < 3 {
        return order;
    }

    let mut chain: Vec<usize> = Vec::with_capacity(2 * order.len());
    // lower hull, then upper hull
    for pass in [order.clone(), order.iter().rev().copied().collect()] {
        let start = chain.len();
        for &k in &pass {
            while chain.len() >= start + 2
                && cross(
                    &points[chain[chain.len() - 2]],
                    &points[chain[chain.len() - 1]],
                    &points[k],
                ) < -CROSS_EPS
            {
                chain.pop();
            }
            chain.push(k);
        }
    }

    let mut seen = vec![false; points.len()];
    chain.retain(|&k| !std::mem::replace(&mut seen[k], true));
    chain
}
