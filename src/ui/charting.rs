use crate::time_series::ScorePoint;
use crate::util::format_clock;

/// Narrowest x range shown, in seconds
const MIN_SPAN_SECS: f64 = 60.0;

/// X (elapsed seconds) bounds for the score chart
pub fn x_bounds(points: &[ScorePoint]) -> [f64; 2] {
    let start = points.first().map_or(0.0, |p| p.t);
    let end = points.last().map_or(0.0, |p| p.t);
    if end - start < MIN_SPAN_SECS {
        [start, start + MIN_SPAN_SECS]
    } else {
        [start, end]
    }
}

/// Start, middle and end labels as mm:ss
pub fn x_labels(bounds: [f64; 2]) -> Vec<String> {
    let mid = (bounds[0] + bounds[1]) / 2.0;
    [bounds[0], mid, bounds[1]]
        .iter()
        .map(|t| format_clock(t.max(0.0).round() as u64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_gets_a_minute() {
        assert_eq!(x_bounds(&[]), [0.0, 60.0]);
    }

    #[test]
    fn long_history_spans_its_points() {
        let points = [ScorePoint::new(30.0, 10.0), ScorePoint::new(150.0, 40.0)];
        assert_eq!(x_bounds(&points), [30.0, 150.0]);
        assert_eq!(x_labels([30.0, 150.0]), vec!["00:30", "01:30", "02:30"]);
    }
}
