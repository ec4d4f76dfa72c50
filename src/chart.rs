//! Recovery of data values from charts that only exist as rendered SVG.
//!
//! The ranking chart on a snapshot page carries no numeric series, only the
//! pixel geometry of its markers and the text of its y-axis tick labels.
//! Decoders map that geometry back onto the axis, linearly and
//! approximately.

use crate::error::FormatError;
use crate::fields::parse_number;

/// Raw geometry of one rendered chart, as isolated from the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartGeometry {
    /// Drawing height in pixels.
    pub height: f64,
    /// Y-axis tick label texts, in axis order (first label sits at pixel
    /// row 0).
    pub axis_labels: Vec<String>,
    /// One path description per marker, in rendering order.
    pub marker_paths: Vec<String>,
}

impl ChartGeometry {
    /// Builds the geometry from the raw `height` attribute of the chart's
    /// root element.
    pub fn from_raw(
        height: &str,
        axis_labels: Vec<String>,
        marker_paths: Vec<String>,
    ) -> Result<Self, FormatError> {
        let height = parse_number(height)
            .map_err(|_| FormatError::Chart(format!("unreadable chart height {height:?}")))?;
        Ok(Self {
            height,
            axis_labels,
            marker_paths,
        })
    }
}

/// Anything able to turn chart geometry back into ordered data values.
pub trait ChartDecoder: Send + Sync {
    fn decode(&self, chart: &ChartGeometry) -> Result<Vec<i64>, FormatError>;
}

/// Decoder for Highcharts line charts, whose single-point marker paths start
/// with `M x y ...`: the y ordinate is the third whitespace-separated token.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighchartsDecoder;

impl HighchartsDecoder {
    fn marker_ordinate(path: &str) -> Result<f64, FormatError> {
        let token = path
            .split_whitespace()
            .nth(2)
            .ok_or_else(|| FormatError::Chart(format!("marker path {path:?} is too short")))?;
        token
            .parse::<f64>()
            .ok()
            .filter(|y| y.is_finite())
            .ok_or_else(|| FormatError::Chart(format!("marker ordinate {token:?} is not a number")))
    }
}

impl ChartDecoder for HighchartsDecoder {
    // Only the first and last tick labels are used, so a chart with more
    // ticks on a non-linear axis would be mis-scaled.
    fn decode(&self, chart: &ChartGeometry) -> Result<Vec<i64>, FormatError> {
        if !(chart.height.is_finite() && chart.height > 0.0) {
            return Err(FormatError::Chart(format!(
                "chart height must be positive, got {}",
                chart.height
            )));
        }

        let axis = chart
            .axis_labels
            .iter()
            .map(|label| {
                parse_number(label)
                    .map_err(|_| FormatError::Chart(format!("axis label {label:?} is not a number")))
            })
            .collect::<Result<Vec<f64>, _>>()?;
        let (min_y, max_y) = match (axis.first(), axis.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(FormatError::Chart("chart has no axis labels".to_string())),
        };

        let scale = (max_y - min_y) / chart.height;

        chart
            .marker_paths
            .iter()
            .map(|path| {
                let y = Self::marker_ordinate(path)?;
                Ok((scale * y + min_y).round_ties_even() as i64)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn marker(y: f64) -> String {
        format!("M 120 {y} A 4 4 0 1 1 120.004 {y} Z")
    }

    #[test]
    fn maps_pixels_linearly_onto_the_axis() {
        let chart = ChartGeometry {
            height: 100.0,
            axis_labels: strings(&["0", "100"]),
            marker_paths: vec![marker(90.0), marker(50.0), marker(10.0)],
        };
        // value = scale * y + min_y in marker order, so pixel rows pass straight through
        assert_eq!(HighchartsDecoder.decode(&chart).unwrap(), vec![90, 50, 10]);
    }

    #[test]
    fn uses_first_and_last_labels_with_offset_axis() {
        // Rank axis: 40 at the top row, 60 at the bottom of a 200px chart.
        let chart = ChartGeometry {
            height: 200.0,
            axis_labels: strings(&["40", "50", "60"]),
            marker_paths: vec![marker(70.0), marker(30.0), marker(110.0)],
        };
        assert_eq!(HighchartsDecoder.decode(&chart).unwrap(), vec![47, 43, 51]);
    }

    #[test]
    fn values_are_not_clamped_to_the_label_range() {
        let chart = ChartGeometry {
            height: 100.0,
            axis_labels: strings(&["1,000", "2,000"]),
            marker_paths: vec![marker(-10.0), marker(125.0)],
        };
        assert_eq!(HighchartsDecoder.decode(&chart).unwrap(), vec![900, 2250]);
    }

    #[test]
    fn malformed_geometry_is_fatal() {
        let good_axis = strings(&["0", "100"]);
        let cases = [
            ChartGeometry {
                height: 100.0,
                axis_labels: vec![],
                marker_paths: vec![marker(1.0)],
            },
            ChartGeometry {
                height: 100.0,
                axis_labels: strings(&["0", "lots"]),
                marker_paths: vec![marker(1.0)],
            },
            ChartGeometry {
                height: 100.0,
                axis_labels: good_axis.clone(),
                marker_paths: vec!["M 1".to_string()],
            },
            ChartGeometry {
                height: 100.0,
                axis_labels: good_axis.clone(),
                marker_paths: vec!["M 1 y".to_string()],
            },
            ChartGeometry {
                height: 0.0,
                axis_labels: good_axis,
                marker_paths: vec![marker(1.0)],
            },
        ];
        for chart in cases {
            assert!(matches!(
                HighchartsDecoder.decode(&chart),
                Err(FormatError::Chart(_))
            ));
        }
    }

    #[test]
    fn parses_height_attribute() {
        let chart = ChartGeometry::from_raw("160", vec![], vec![]).unwrap();
        assert_eq!(chart.height, 160.0);
        assert!(ChartGeometry::from_raw("auto", vec![], vec![]).is_err());
    }
}
