//! SVG export serializer.
//!
//! Converts traced curves into an SVG string with `<path>` elements using
//! the [`svg`] crate for document construction, XML escaping, and path
//! data formatting.
//!
//! The `viewBox` is the plotted box itself, with the y axis flipped so
//! the picture has mathematical orientation (y grows upward). Each curve
//! becomes a separate `<path>` using `M` (move to) and `L` (line to)
//! commands; closed curves end with a close-path command.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Description, Element, Group, Line, Path, Title};
use svg::node::{Node, Text, Value};

use zeroset_engine::{Bounds, Point, Polyline};

/// Length in pixels of the longer side of the document.
const DOCUMENT_SIZE_PX: f64 = 800.0;

/// Grid lines per axis above which the grid is left out.
const MAX_GRID_LINES: f64 = 500.0;

/// Namespace of the `<zeroset:config>` metadata element.
const CONFIG_NAMESPACE: &str = "https://zeroset.dev/ns/1";

/// Metadata to embed in the SVG document.
///
/// All fields are optional. When present, a `<title>` and/or `<desc>`
/// element is emitted immediately after the opening `<svg>` tag.
///
/// Text values are XML-escaped automatically by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the field name or expression.
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized engine configuration, emitted inside a `<metadata>`
    /// element wrapped in a namespaced `<zeroset:config>` element so the
    /// plot can be reproduced.
    pub config_json: Option<&'a str>,
}

/// Map a plane point to SVG user space (y flipped).
fn to_user(p: &Point) -> (f64, f64) {
    (p.x(), -p.y())
}

/// Build an SVG path `d` attribute string from a curve.
///
/// Uses `M` for the first point and `L` for subsequent points, with y
/// negated. A closed curve drops its repeated last point and ends with a
/// close-path command instead. Returns an empty string for curves with
/// fewer than 2 points.
///
/// # Examples
///
/// ```
/// use zeroset_engine::{Point, Polyline};
/// use zeroset_export::build_path_data;
///
/// let curve = Polyline::new(vec![Point::xy(10.0, 20.0), Point::xy(30.0, 40.0)]);
/// assert_eq!(build_path_data(&curve), "M10,-20 L30,-40");
/// ```
#[must_use]
pub fn build_path_data(curve: &Polyline) -> String {
    let points = curve.points();
    if points.len() < 2 {
        return String::new();
    }

    let closed = curve.is_closed() && points.len() > 2;
    let body = if closed {
        &points[1..points.len() - 1]
    } else {
        &points[1..]
    };

    let mut data = Data::new().move_to(to_user(&points[0]));
    for p in body {
        data = data.line_to(to_user(p));
    }
    if closed {
        data = data.close();
    }
    String::from(Value::from(data))
}

/// Light grid with lines at integer multiples of `step` inside `bounds`.
///
/// Returns `None` if `step` is not positive or would draw more than
/// [`MAX_GRID_LINES`] lines on some axis.
fn grid(bounds: &Bounds, step: f64) -> Option<Group> {
    if !(step.is_finite() && step > 0.0) {
        return None;
    }
    let (min, max) = (bounds.min(), bounds.max());
    let (x_min, y_min, x_max, y_max) = (min.x(), min.y(), max.x(), max.y());
    if (x_max - x_min) / step > MAX_GRID_LINES || (y_max - y_min) / step > MAX_GRID_LINES {
        return None;
    }

    let mut group = Group::new()
        .set("id", "grid")
        .set("stroke", "gray")
        .set("stroke-opacity", 0.3)
        .set("stroke-width", 1)
        .set("vector-effect", "non-scaling-stroke");

    let mut x = (x_min / step).ceil() * step;
    while x <= x_max {
        group = group.add(
            Line::new()
                .set("x1", x)
                .set("y1", -y_max)
                .set("x2", x)
                .set("y2", -y_min),
        );
        x += step;
    }
    let mut y = (y_min / step).ceil() * step;
    while y <= y_max {
        group = group.add(
            Line::new()
                .set("x1", x_min)
                .set("y1", -y)
                .set("x2", x_max)
                .set("y2", -y),
        );
        y += step;
    }
    Some(group)
}

/// Serialize curves into an SVG document string.
///
/// Each [`Polyline`] with 2 or more points becomes a `<path>` element.
/// Curves with fewer than 2 points are skipped (a single point cannot
/// form a visible line segment).
///
/// The `viewBox` covers `bounds` with y flipped, and the document is
/// [`DOCUMENT_SIZE_PX`] pixels along its longer side. Strokes do not
/// scale with the `viewBox`. When `grid_step` is `Some`, a light gray
/// grid is drawn beneath the curves.
///
/// # Examples
///
/// ```
/// use zeroset_engine::{Bounds, Point, Polyline};
/// use zeroset_export::{SvgMetadata, to_svg};
///
/// let curves = vec![Polyline::new(vec![Point::xy(-1.0, 0.5), Point::xy(1.0, 0.5)])];
/// let bounds = Bounds::xy(-2.0, -1.0, 2.0, 1.0).unwrap();
/// let metadata = SvgMetadata {
///     title: Some("y = 0.5"),
///     ..SvgMetadata::default()
/// };
/// let svg = to_svg(&curves, &bounds, &metadata, None);
/// assert!(svg.contains(r#"viewBox="-2 -1 4 2""#));
/// assert!(svg.contains("<title>y = 0.5</title>"));
/// assert!(svg.contains("M-1,-0.5 L1,-0.5"));
/// ```
#[must_use]
pub fn to_svg(
    curves: &[Polyline],
    bounds: &Bounds,
    metadata: &SvgMetadata<'_>,
    grid_step: Option<f64>,
) -> String {
    let (min, max) = (bounds.min(), bounds.max());
    let width = max.x() - min.x();
    let height = max.y() - min.y();
    let scale = DOCUMENT_SIZE_PX / width.max(height);

    let mut doc = Document::new()
        .set("width", width * scale)
        .set("height", height * scale)
        .set("viewBox", (min.x(), -max.y(), width, height));

    // Optional <title> element
    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    // Optional <desc> element
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    // Optional <metadata> element with the engine configuration
    if let Some(config_json) = metadata.config_json {
        let mut config_el = Element::new("zeroset:config");
        config_el.assign("xmlns:zeroset", CONFIG_NAMESPACE);
        config_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(config_el);
        doc = doc.add(metadata_el);
    }

    if let Some(group) = grid_step.and_then(|step| grid(bounds, step)) {
        doc = doc.add(group);
    }

    for curve in curves {
        let d = build_path_data(curve);
        if d.is_empty() {
            continue;
        }
        let path = Path::new()
            .set("d", d)
            .set("fill", "none")
            .set("stroke", "black")
            .set("stroke-width", 1)
            .set("vector-effect", "non-scaling-stroke");
        doc = doc.add(path);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
