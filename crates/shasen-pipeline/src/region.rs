//! Region-of-interest masking.
//!
//! Road photographs place the lane surface in a trapezoid that is wide
//! at the bottom of the frame and narrows toward the horizon. This
//! module derives that trapezoid from an image's dimensions and clears
//! every edge pixel outside it, so that later stages only see edges
//! where lane markings can plausibly appear.

use image::GrayImage;
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

use crate::types::{Dimensions, MaskFractions, PipelineError, Polygon, Vertex};

/// Derive the road-facing trapezoid for an image of the given size.
///
/// Vertices are produced in bottom-left, top-left, top-right,
/// bottom-right order. `x_pct` sets both the bottom inset and the half
/// width of the top edge around the image centre; `y_pct` sets the
/// height of the top edge. Coordinates are truncated to whole pixels
/// and clamped into the image bounds, so the bottom edge sits on the
/// last row.
#[must_use]
pub fn road_trapezoid(dimensions: Dimensions, fractions: MaskFractions) -> Polygon {
    let w = f64::from(dimensions.width);
    let h = f64::from(dimensions.height);
    let corners = [
        (fractions.x_pct * w, h),
        ((0.5 - fractions.x_pct) * w, fractions.y_pct * h),
        ((0.5 + fractions.x_pct) * w, fractions.y_pct * h),
        ((1.0 - fractions.x_pct) * w, h),
    ];
    Polygon::new(
        corners
            .into_iter()
            .map(|(x, y)| clamped_vertex(x, y, dimensions))
            .collect(),
    )
}

#[allow(clippy::cast_possible_truncation)]
fn clamped_vertex(x: f64, y: f64, dimensions: Dimensions) -> Vertex {
    let max_x = (f64::from(dimensions.width) - 1.0).max(0.0);
    let max_y = (f64::from(dimensions.height) - 1.0).max(0.0);
    Vertex::new(x.clamp(0.0, max_x) as i32, y.clamp(0.0, max_y) as i32)
}

/// Clear every edge pixel outside the polygon.
///
/// Fills the polygon into a stencil and keeps only the edge pixels
/// under it. The output has the same dimensions as the input. A
/// polygon with fewer than three distinct vertices selects nothing,
/// so the result is entirely black.
///
/// # Errors
///
/// Returns [`PipelineError::PolygonOutOfBounds`] if any vertex lies
/// outside the image. Derived trapezoids are always in bounds; this
/// guards explicitly supplied polygons.
pub fn mask_region(edges: &GrayImage, polygon: &Polygon) -> Result<GrayImage, PipelineError> {
    let dimensions = Dimensions {
        width: edges.width(),
        height: edges.height(),
    };
    validate_vertices(polygon, dimensions)?;

    let stencil = fill_stencil(dimensions, polygon);
    let mut masked = edges.clone();
    for (stencil_pixel, masked_pixel) in stencil.pixels().zip(masked.pixels_mut()) {
        if stencil_pixel.0[0] == 0 {
            masked_pixel.0[0] = 0;
        }
    }
    Ok(masked)
}

fn validate_vertices(polygon: &Polygon, dimensions: Dimensions) -> Result<(), PipelineError> {
    let width = i64::from(dimensions.width);
    let height = i64::from(dimensions.height);
    for vertex in polygon.vertices() {
        let x = i64::from(vertex.x);
        let y = i64::from(vertex.y);
        if x < 0 || x >= width || y < 0 || y >= height {
            return Err(PipelineError::PolygonOutOfBounds {
                x: vertex.x,
                y: vertex.y,
                width: dimensions.width,
                height: dimensions.height,
            });
        }
    }
    Ok(())
}

fn fill_stencil(dimensions: Dimensions, polygon: &Polygon) -> GrayImage {
    let mut stencil = GrayImage::new(dimensions.width, dimensions.height);
    let mut points: Vec<Point<i32>> = polygon
        .vertices()
        .iter()
        .map(|vertex| Point::new(vertex.x, vertex.y))
        .collect();
    // draw_polygon_mut expects an open ring and rasterizes degenerate
    // ones as bare line runs.
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    if !has_three_distinct(&points) {
        return stencil;
    }
    draw_polygon_mut(&mut stencil, &points, image::Luma([255]));
    stencil
}

fn has_three_distinct(points: &[Point<i32>]) -> bool {
    let mut seen: Vec<Point<i32>> = Vec::with_capacity(3);
    for &point in points {
        if !seen.contains(&point) {
            seen.push(point);
            if seen.len() == 3 {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn all_white(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |_, _| image::Luma([255]))
    }

    fn square_polygon() -> Polygon {
        Polygon::new(vec![
            Vertex::new(2, 2),
            Vertex::new(17, 2),
            Vertex::new(17, 17),
            Vertex::new(2, 17),
        ])
    }

    #[test]
    fn trapezoid_vertices_for_default_fractions() {
        let dimensions = Dimensions {
            width: 960,
            height: 540,
        };
        let fractions = MaskFractions {
            x_pct: 0.05,
            y_pct: 0.60,
        };
        let polygon = road_trapezoid(dimensions, fractions);
        assert_eq!(
            polygon.vertices(),
            &[
                Vertex::new(48, 539),
                Vertex::new(432, 324),
                Vertex::new(528, 324),
                Vertex::new(912, 539),
            ],
        );
    }

    #[test]
    fn trapezoid_bottom_edge_sits_on_last_row() {
        let dimensions = Dimensions {
            width: 100,
            height: 80,
        };
        let fractions = MaskFractions {
            x_pct: 0.1,
            y_pct: 0.5,
        };
        let polygon = road_trapezoid(dimensions, fractions);
        assert_eq!(polygon.vertices()[0].y, 79);
        assert_eq!(polygon.vertices()[3].y, 79);
    }

    #[test]
    fn trapezoid_stays_in_bounds_for_odd_dimensions() {
        let dimensions = Dimensions {
            width: 33,
            height: 17,
        };
        let fractions = MaskFractions {
            x_pct: 0.05,
            y_pct: 0.60,
        };
        let polygon = road_trapezoid(dimensions, fractions);
        for vertex in polygon.vertices() {
            assert!(vertex.x >= 0 && vertex.x < 33, "x out of bounds: {vertex:?}");
            assert!(vertex.y >= 0 && vertex.y < 17, "y out of bounds: {vertex:?}");
        }
    }

    #[test]
    fn trapezoid_masks_its_own_image() {
        let dimensions = Dimensions {
            width: 120,
            height: 90,
        };
        let fractions = MaskFractions {
            x_pct: 0.05,
            y_pct: 0.60,
        };
        let polygon = road_trapezoid(dimensions, fractions);
        let edges = all_white(120, 90);
        // Derived vertices are clamped, so validation cannot fail.
        let masked = mask_region(&edges, &polygon).unwrap();
        assert_eq!(masked.dimensions(), edges.dimensions());
    }

    #[test]
    fn mask_keeps_edges_inside_polygon() {
        let edges = all_white(20, 20);
        let masked = mask_region(&edges, &square_polygon()).unwrap();
        assert_eq!(masked.get_pixel(10, 10).0[0], 255);
        assert_eq!(masked.get_pixel(5, 12).0[0], 255);
    }

    #[test]
    fn mask_clears_edges_outside_polygon() {
        let edges = all_white(20, 20);
        let masked = mask_region(&edges, &square_polygon()).unwrap();
        assert_eq!(masked.get_pixel(0, 0).0[0], 0);
        assert_eq!(masked.get_pixel(19, 0).0[0], 0);
        assert_eq!(masked.get_pixel(0, 19).0[0], 0);
        assert_eq!(masked.get_pixel(19, 19).0[0], 0);
    }

    #[test]
    fn closed_ring_matches_open_polygon() {
        let edges = all_white(20, 20);
        let open = mask_region(&edges, &square_polygon()).unwrap();
        let closed = mask_region(
            &edges,
            &Polygon::new(vec![
                Vertex::new(2, 2),
                Vertex::new(17, 2),
                Vertex::new(17, 17),
                Vertex::new(2, 17),
                Vertex::new(2, 2),
            ]),
        )
        .unwrap();
        assert_eq!(open, closed);
    }

    #[test]
    fn doubled_closing_vertex_matches_open_polygon() {
        let edges = all_white(20, 20);
        let open = mask_region(&edges, &square_polygon()).unwrap();
        let doubled = mask_region(
            &edges,
            &Polygon::new(vec![
                Vertex::new(2, 2),
                Vertex::new(17, 2),
                Vertex::new(17, 17),
                Vertex::new(2, 17),
                Vertex::new(2, 2),
                Vertex::new(2, 2),
            ]),
        )
        .unwrap();
        assert_eq!(open, doubled);
    }

    #[test]
    fn out_of_bounds_vertex_is_rejected() {
        let edges = all_white(20, 20);
        let polygon = Polygon::new(vec![
            Vertex::new(2, 2),
            Vertex::new(25, 5),
            Vertex::new(17, 17),
        ]);
        let result = mask_region(&edges, &polygon);
        assert!(matches!(
            result,
            Err(PipelineError::PolygonOutOfBounds {
                x: 25,
                y: 5,
                width: 20,
                height: 20,
            }),
        ));
    }

    #[test]
    fn negative_vertex_is_rejected() {
        let edges = all_white(20, 20);
        let polygon = Polygon::new(vec![
            Vertex::new(-1, 2),
            Vertex::new(17, 2),
            Vertex::new(17, 17),
        ]);
        assert!(matches!(
            mask_region(&edges, &polygon),
            Err(PipelineError::PolygonOutOfBounds { x: -1, y: 2, .. }),
        ));
    }

    #[test]
    fn empty_polygon_selects_nothing() {
        let edges = all_white(20, 20);
        let masked = mask_region(&edges, &Polygon::new(Vec::new())).unwrap();
        assert!(masked.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn two_vertex_polygon_selects_nothing() {
        let edges = all_white(20, 20);
        let polygon = Polygon::new(vec![Vertex::new(2, 2), Vertex::new(17, 17)]);
        let masked = mask_region(&edges, &polygon).unwrap();
        assert!(masked.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn degenerate_ring_selects_nothing() {
        // Two distinct vertices padded out with closing repeats must
        // not leave a line of selected pixels behind.
        let edges = all_white(20, 20);
        let polygon = Polygon::new(vec![
            Vertex::new(2, 2),
            Vertex::new(17, 17),
            Vertex::new(2, 2),
            Vertex::new(2, 2),
        ]);
        let masked = mask_region(&edges, &polygon).unwrap();
        assert!(masked.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn interleaved_duplicates_select_nothing() {
        let edges = all_white(20, 20);
        let polygon = Polygon::new(vec![
            Vertex::new(2, 2),
            Vertex::new(17, 17),
            Vertex::new(2, 2),
            Vertex::new(17, 17),
        ]);
        let masked = mask_region(&edges, &polygon).unwrap();
        assert!(masked.pixels().all(|p| p.0[0] == 0));
    }
}
