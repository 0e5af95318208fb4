//! Observations reported back by the peer.

use serde::{Deserialize, Serialize};

/// One reply from the peer after executing a command.
///
/// Every field is required on the wire. A reply without `Axes` is a
/// malformed payload, not an observation with empty joint state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Pose/state of the tracked object.
    #[serde(rename = "Obj")]
    pub object: Vec<f64>,

    /// End-effector position.
    #[serde(rename = "EndEffector")]
    pub end_effector: Vec<f64>,

    /// Current joint state.
    #[serde(rename = "Axes")]
    pub axes: Vec<f64>,
}

impl Observation {
    pub fn new(object: Vec<f64>, end_effector: Vec<f64>, axes: Vec<f64>) -> Self {
        Self {
            object,
            end_effector,
            axes,
        }
    }

    /// Concatenate object, end-effector and joint state into one vector.
    pub fn flatten(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(&self.object);
        out.extend_from_slice(&self.end_effector);
        out.extend_from_slice(&self.axes);
        out
    }

    /// Total number of scalar values.
    pub fn len(&self) -> usize {
        self.object.len() + self.end_effector.len() + self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_keeps_field_order() {
        let obs = Observation::new(vec![1.0, 2.0], vec![3.0], vec![4.0, 5.0]);
        assert_eq!(obs.flatten(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(obs.len(), 5);
        assert!(!obs.is_empty());
    }

    #[test]
    fn serializes_with_wire_names() {
        let obs = Observation::new(vec![0.0], vec![1.0], vec![2.0]);
        let json = serde_json::to_value(&obs).unwrap();
        assert!(json.get("Obj").is_some());
        assert!(json.get("EndEffector").is_some());
        assert!(json.get("Axes").is_some());
    }
}
