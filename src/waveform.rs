use crate::preamble::Preamble;
use polars::prelude::*;

pub const TIME_COLUMN_NAME: &str = "time";
pub const VOLTAGE_COLUMN_NAME: &str = "voltage";

/// A calibrated capture: seconds on one axis, volts on the other.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub time: Vec<f64>,
    pub voltage: Vec<f64>,
}

impl Waveform {
    pub fn new(time: Vec<f64>, voltage: Vec<f64>) -> Self {
        debug_assert_eq!(time.len(), voltage.len());
        Self { time, voltage }
    }

    /// Apply the preamble's calibration to a raw capture.
    pub fn from_raw(preamble: &Preamble, raw: &[i16]) -> Self {
        Self::new(time_axis(preamble), scale_samples(raw, preamble.y_scale))
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.time.iter().copied().zip(self.voltage.iter().copied())
    }

    pub fn to_dataframe(&self) -> Result<DataFrame, PolarsError> {
        DataFrame::new(vec![
            Series::new(TIME_COLUMN_NAME.into(), self.time.as_slice()).into(),
            Series::new(VOLTAGE_COLUMN_NAME.into(), self.voltage.as_slice()).into(),
        ])
    }
}

/// `x_offset + i * x_increment` for every sample in the record.
pub fn time_axis(preamble: &Preamble) -> Vec<f64> {
    (0..preamble.record_length)
        .map(|i| (i as f64).mul_add(preamble.x_increment, preamble.x_offset))
        .collect()
}

pub fn scale_samples(raw: &[i16], y_scale: f64) -> Vec<f64> {
    raw.iter().map(|&sample| f64::from(sample) * y_scale).collect()
}

/// Column-wise mean of equally long rows.
pub fn mean_rows(rows: &[Vec<f64>]) -> Vec<f64> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };

    let mut sums = vec![0.0; first.len()];
    for row in rows {
        for (sum, value) in sums.iter_mut().zip(row) {
            *sum += value;
        }
    }

    let count = rows.len() as f64;
    sums.into_iter().map(|sum| sum / count).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_channel::MockChannel;

    fn preamble(record_length: usize, x_increment: f64, y_scale: f64) -> Preamble {
        MockChannel::preamble_reply(record_length, x_increment, 0.0, y_scale)
            .parse()
            .unwrap()
    }

    #[test]
    fn test_calibration_transform() {
        let waveform = Waveform::from_raw(&preamble(3, 1e-9, 0.002), &[0, 500, -500]);
        assert_eq!(waveform.time, vec![0.0, 1e-9, 2e-9]);
        assert_eq!(waveform.voltage, vec![0.0, 1.0, -1.0]);
    }

    #[test]
    fn test_time_axis_starts_at_offset() {
        let mut preamble = preamble(4, 2e-6, 1.0);
        preamble.x_offset = -4e-6;
        let time = time_axis(&preamble);
        assert_eq!(time.len(), 4);
        assert!((time[0] + 4e-6).abs() < 1e-18);
        assert!(time[2].abs() < 1e-18);
        assert!((time[3] - 2e-6).abs() < 1e-18);
    }

    #[test]
    fn test_mean_rows() {
        let rows = vec![vec![1.0, 2.0, -1.0], vec![3.0, 2.0, 1.0]];
        assert_eq!(mean_rows(&rows), vec![2.0, 2.0, 0.0]);
        assert!(mean_rows(&[]).is_empty());
    }

    #[test]
    fn test_mean_of_identical_rows_is_unchanged() {
        let row = vec![0.0, 0.25, -1.5, 3.0];
        let rows = vec![row.clone(); 8];
        assert_eq!(mean_rows(&rows), row);
    }

    #[test]
    fn test_to_dataframe() {
        let waveform = Waveform::new(vec![0.0, 1e-9], vec![0.5, -0.5]);
        let df = waveform.to_dataframe().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 2);
        assert!(df.column(TIME_COLUMN_NAME).is_ok());

        let voltage: Vec<f64> = df
            .column(VOLTAGE_COLUMN_NAME)
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(voltage, waveform.voltage);
    }
}
