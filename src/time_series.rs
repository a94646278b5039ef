/// Fatigue score sampled at a point in the session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScorePoint {
    pub t: f64,
    pub score: f64,
}

impl ScorePoint {
    pub fn new(t: f64, score: f64) -> Self {
        Self { t, score }
    }
}

impl From<ScorePoint> for (f64, f64) {
    fn from(p: ScorePoint) -> Self {
        (p.t, p.score)
    }
}

/// Bounded history of score samples, oldest first
#[derive(Debug, Clone)]
pub struct ScoreHistory {
    points: Vec<ScorePoint>,
    capacity: usize,
}

impl ScoreHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, point: ScorePoint) {
        self.points.push(point);
        // trim in batches so pushes stay cheap
        if self.points.len() >= self.capacity * 2 {
            let excess = self.points.len() - self.capacity;
            self.points.drain(..excess);
        }
    }

    /// At most `capacity` most recent points
    pub fn recent(&self) -> &[ScorePoint] {
        let start = self.points.len().saturating_sub(self.capacity);
        &self.points[start..]
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_is_bounded_and_ordered() {
        let mut history = ScoreHistory::new(3);
        for i in 0..10 {
            history.push(ScorePoint::new(i as f64, (i * 10) as f64));
        }
        let ts: Vec<f64> = history.recent().iter().map(|p| p.t).collect();
        assert_eq!(ts, vec![7.0, 8.0, 9.0]);

        history.clear();
        assert!(history.is_empty());
        assert!(history.recent().is_empty());
    }

    #[test]
    fn point_into_tuple() {
        let t: (f64, f64) = ScorePoint::new(1.5, 40.0).into();
        assert_eq!(t, (1.5, 40.0));
    }
}
