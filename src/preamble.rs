use std::str::FromStr;

/// Number of fields in a `WFMOutpre?` reply.
pub const PREAMBLE_FIELD_COUNT: usize = 19;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreambleError {
    #[error("Preamble has {actual} fields, expected {expected}")]
    FieldCount { expected: usize, actual: usize },

    #[error("Preamble field {field} has non-numeric value '{value}'")]
    InvalidNumber { field: &'static str, value: String },
}

/// Waveform output preamble, in the order the instrument reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct Preamble {
    pub byte_width: u32,
    pub bit_width: u32,
    pub encoding: String,
    pub binary_format: String,
    pub byte_order: String,
    pub curve_params: String,
    pub points_requested: usize,
    pub point_format: String,
    pub x_unit: String,
    /// Seconds per sample.
    pub x_increment: f64,
    /// Time of the first sample, in seconds.
    pub x_offset: f64,
    pub channel_offset: String,
    pub y_unit: String,
    /// Volts per digitizing level.
    pub y_scale: f64,
    pub y_offset: f64,
    pub y_zero: f64,
    pub composition: String,
    pub record_length: usize,
    pub filter_frequency: String,
}

fn parse_field<T: FromStr>(field: &'static str, value: &str) -> Result<T, PreambleError> {
    value
        .trim()
        .parse()
        .map_err(|_| PreambleError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

impl FromStr for Preamble {
    type Err = PreambleError;

    fn from_str(reply: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = reply.trim_end_matches(['\r', '\n']).split(';').collect();
        let &[
            byte_width,
            bit_width,
            encoding,
            binary_format,
            byte_order,
            curve_params,
            points_requested,
            point_format,
            x_unit,
            x_increment,
            x_offset,
            channel_offset,
            y_unit,
            y_scale,
            y_offset,
            y_zero,
            composition,
            record_length,
            filter_frequency,
        ] = fields.as_slice()
        else {
            return Err(PreambleError::FieldCount {
                expected: PREAMBLE_FIELD_COUNT,
                actual: fields.len(),
            });
        };

        Ok(Self {
            byte_width: parse_field("byte width", byte_width)?,
            bit_width: parse_field("bit width", bit_width)?,
            encoding: encoding.to_string(),
            binary_format: binary_format.to_string(),
            byte_order: byte_order.to_string(),
            curve_params: curve_params.to_string(),
            points_requested: parse_field("points requested", points_requested)?,
            point_format: point_format.to_string(),
            x_unit: x_unit.to_string(),
            x_increment: parse_field("x increment", x_increment)?,
            x_offset: parse_field("x offset", x_offset)?,
            channel_offset: channel_offset.to_string(),
            y_unit: y_unit.to_string(),
            y_scale: parse_field("y scale", y_scale)?,
            y_offset: parse_field("y offset", y_offset)?,
            y_zero: parse_field("y zero", y_zero)?,
            composition: composition.to_string(),
            record_length: parse_field("record length", record_length)?,
            filter_frequency: filter_frequency.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DPO2014_PREAMBLE: &str = "2;16;BIN;RI;MSB;\"Ch2, DC coupling, 2.0E+0 V/div, 4.0E-6 s/div, 3 points, Sample mode\";3;Y;\"s\";1.0E-9;0.0E+0;0;\"V\";2.0E-3;0.0E+0;0.0E+0;SINGULAR_YT;3;200.0E+6";

    #[test]
    fn test_decode_dpo2014_reply() {
        let preamble: Preamble = DPO2014_PREAMBLE.parse().unwrap();
        assert_eq!(preamble.byte_width, 2);
        assert_eq!(preamble.bit_width, 16);
        assert_eq!(preamble.encoding, "BIN");
        assert_eq!(preamble.binary_format, "RI");
        assert_eq!(preamble.byte_order, "MSB");
        assert_eq!(preamble.points_requested, 3);
        assert_eq!(preamble.x_unit, "\"s\"");
        assert!((preamble.x_increment - 1e-9).abs() < f64::EPSILON);
        assert!((preamble.y_scale - 2e-3).abs() < f64::EPSILON);
        assert_eq!(preamble.composition, "SINGULAR_YT");
        assert_eq!(preamble.record_length, 3);
        assert_eq!(preamble.filter_frequency, "200.0E+6");
    }

    #[test]
    fn test_decode_is_deterministic() {
        let first: Preamble = DPO2014_PREAMBLE.parse().unwrap();
        let second: Preamble = DPO2014_PREAMBLE.parse().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_decode_tolerates_line_terminator() {
        let with_newline = format!("{DPO2014_PREAMBLE}\n");
        assert_eq!(
            with_newline.parse::<Preamble>().unwrap(),
            DPO2014_PREAMBLE.parse::<Preamble>().unwrap()
        );
    }

    #[test]
    fn test_wrong_field_count() {
        assert_eq!(
            "2;16;BIN".parse::<Preamble>(),
            Err(PreambleError::FieldCount {
                expected: 19,
                actual: 3
            })
        );

        let too_many = format!("{DPO2014_PREAMBLE};extra");
        assert!(matches!(
            too_many.parse::<Preamble>(),
            Err(PreambleError::FieldCount { actual: 20, .. })
        ));
    }

    #[test]
    fn test_non_numeric_field() {
        let broken = DPO2014_PREAMBLE.replacen("2.0E-3", "two millivolts", 1);
        assert_eq!(
            broken.parse::<Preamble>(),
            Err(PreambleError::InvalidNumber {
                field: "y scale",
                value: "two millivolts".to_string()
            })
        );

        let negative_length = DPO2014_PREAMBLE.replacen("SINGULAR_YT;3", "SINGULAR_YT;-3", 1);
        assert!(matches!(
            negative_length.parse::<Preamble>(),
            Err(PreambleError::InvalidNumber {
                field: "record length",
                ..
            })
        ));
    }
}
