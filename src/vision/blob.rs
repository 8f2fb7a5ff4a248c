use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::point::Point;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// The dominant blob of one channel mask.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Center of the minimal enclosing circle, rounded to whole pixels.
    pub position: Point<i32>,
    pub radius: f64,
    pub area: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct BlobDetector {
    min_radius: f64,
}

impl Default for BlobDetector {
    fn default() -> Self {
        Self { min_radius: 10.0 }
    }
}

impl BlobDetector {
    pub fn new(min_radius: f64) -> Self {
        Self { min_radius }
    }

    /// Picks the external contour with the largest enclosed area and reports
    /// its enclosing-circle center. Blobs whose circle radius does not exceed
    /// `min_radius` are noise and yield `None`.
    pub fn detect(&self, mask: &GrayImage) -> Option<Detection> {
        if mask.width() == 0 || mask.height() == 0 {
            return None;
        }

        let contours = find_contours::<i32>(mask);
        let (largest, area) = largest_external(&contours)?;

        let circle = min_enclosing_circle(&largest.points);
        if circle.radius <= self.min_radius {
            return None;
        }

        Some(Detection {
            position: Point::new(circle.cx.round() as i32, circle.cy.round() as i32),
            radius: circle.radius,
            area,
        })
    }
}

fn is_external(contour: &Contour<i32>) -> bool {
    contour.border_type == BorderType::Outer && contour.parent.is_none()
}

/// First external contour of maximal area; later ties do not displace it.
fn largest_external(contours: &[Contour<i32>]) -> Option<(&Contour<i32>, f64)> {
    contours
        .iter()
        .filter(|c| is_external(c))
        .map(|c| (c, contour_area(&c.points)))
        .fold(None, |best, (contour, area)| match best {
            Some((_, best_area)) if area <= best_area => best,
            _ => Some((contour, area)),
        })
}

/// Shoelace area of the polygon through the traced border pixels.
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice.abs() as f64 / 2.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub cx: f64,
    pub cy: f64,
    pub radius: f64,
}

impl Circle {
    fn at(p: (f64, f64)) -> Self {
        Self {
            cx: p.0,
            cy: p.1,
            radius: 0.0,
        }
    }

    fn through_two(a: (f64, f64), b: (f64, f64)) -> Self {
        let cx = (a.0 + b.0) / 2.0;
        let cy = (a.1 + b.1) / 2.0;
        Self {
            cx,
            cy,
            radius: (a.0 - cx).hypot(a.1 - cy),
        }
    }

    fn through_three(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Self {
        let (bx, by) = (b.0 - a.0, b.1 - a.1);
        let (cx, cy) = (c.0 - a.0, c.1 - a.1);
        let d = 2.0 * (bx * cy - by * cx);
        if d.abs() < 1e-12 {
            // Collinear: the farthest pair spans the circle.
            return [
                Self::through_two(a, b),
                Self::through_two(a, c),
                Self::through_two(b, c),
            ]
            .into_iter()
            .fold(Self::at(a), |best, circle| {
                if circle.radius > best.radius {
                    circle
                } else {
                    best
                }
            });
        }
        let b2 = bx * bx + by * by;
        let c2 = cx * cx + cy * cy;
        let ux = (cy * b2 - by * c2) / d;
        let uy = (bx * c2 - cx * b2) / d;
        Self {
            cx: a.0 + ux,
            cy: a.1 + uy,
            radius: ux.hypot(uy),
        }
    }

    fn contains(&self, p: (f64, f64)) -> bool {
        (p.0 - self.cx).hypot(p.1 - self.cy) <= self.radius * (1.0 + 1e-9) + 1e-9
    }
}

/// Smallest circle enclosing every point (Welzl, incremental form).
///
/// Input order is shuffled with a fixed seed so border-ordered contours do
/// not hit the cubic worst case while results stay reproducible.
pub fn min_enclosing_circle(points: &[Point<i32>]) -> Circle {
    let mut pts: Vec<(f64, f64)> = points.iter().map(|p| (p.x as f64, p.y as f64)).collect();
    let Some(&first) = pts.first() else {
        return Circle::at((0.0, 0.0));
    };
    let mut rng = StdRng::seed_from_u64(0x5eed);
    pts.shuffle(&mut rng);

    let mut circle = Circle::at(first);
    for i in 0..pts.len() {
        if circle.contains(pts[i]) {
            continue;
        }
        circle = Circle::at(pts[i]);
        for j in 0..i {
            if circle.contains(pts[j]) {
                continue;
            }
            circle = Circle::through_two(pts[i], pts[j]);
            for k in 0..j {
                if !circle.contains(pts[k]) {
                    circle = Circle::through_three(pts[i], pts[j], pts[k]);
                }
            }
        }
    }
    circle
}
