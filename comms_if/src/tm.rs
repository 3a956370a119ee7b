//! # Steering telemetry
//!
//! Lateral control publishes one `SteerRecord` for each trajectory solver update. The record is
//! informational only and is not a stable protocol. On the wire it is a single line of 37 comma
//! separated numeric fields: the first and last are integers, the rest are printed with six
//! decimal places.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{fmt, str::FromStr};

use crate::plan::{LanePoly, D_POLY_LEN, POLY_LEN};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of fields in a serialised record.
pub const NUM_FIELDS: usize = 37;

/// Index of the desired steering angle field in a serialised record.
pub const ANGLE_STEERS_DES_FIELD: usize = 3;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Quantities used in one solver update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SteerRecord {
    /// Whether lateral control was active
    pub active: bool,

    /// Road wheel angle selected from the solver horizon.
    ///
    /// Units: radians
    pub delta_desired: f64,

    /// Steering angle sensor offset.
    ///
    /// Units: degrees
    pub angle_offset: f64,

    /// Desired steering wheel angle.
    ///
    /// Units: degrees
    pub angle_steers_des: f64,

    /// Effective steering ratio
    pub steer_ratio: f64,

    /// Feedforward gain divided by the ratio factor
    pub scaled_kf: f64,

    /// First proportional gain divided by the ratio factor
    pub scaled_kp: f64,

    /// First integral gain divided by the ratio factor
    pub scaled_ki: f64,

    /// Steering rate cost weight given to the solver
    pub steer_rate_cost: f64,

    pub l_prob: f64,
    pub r_prob: f64,
    pub c_prob: f64,
    pub p_prob: f64,

    pub l_poly: LanePoly,
    pub r_poly: LanePoly,
    pub p_poly: LanePoly,
    pub c_poly: LanePoly,
    pub d_poly: [f64; D_POLY_LEN],

    /// Units: meters
    pub lane_width: f64,

    /// Units: meters
    pub lane_width_estimate: f64,

    pub lane_width_certainty: f64,

    /// Vehicle speed.
    ///
    /// Units: meters/second
    pub v_ego: f64,

    /// Wall clock time at which the record was made.
    ///
    /// Units: nanoseconds since the unix epoch
    pub timestamp_ns: i64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TmParseError {
    #[error("Expected {} fields, found {0}", NUM_FIELDS)]
    WrongFieldCount(usize),

    #[error("Could not parse field {0} ({1:?})")]
    InvalidField(usize, String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SteerRecord {
    /// All floating point fields in wire order, between the leading active flag and the trailing
    /// timestamp.
    fn float_fields(&self) -> Vec<f64> {
        let mut fields = vec![
            self.delta_desired,
            self.angle_offset,
            self.angle_steers_des,
            self.steer_ratio,
            self.scaled_kf,
            self.scaled_kp,
            self.scaled_ki,
            self.steer_rate_cost,
            self.l_prob,
            self.r_prob,
            self.c_prob,
            self.p_prob,
        ];
        fields.extend_from_slice(&self.l_poly);
        fields.extend_from_slice(&self.r_poly);
        fields.extend_from_slice(&self.p_poly);
        fields.extend_from_slice(&self.c_poly);
        fields.extend_from_slice(&self.d_poly);
        fields.extend_from_slice(&[
            self.lane_width,
            self.lane_width_estimate,
            self.lane_width_certainty,
            self.v_ego,
        ]);

        fields
    }
}

impl fmt::Display for SteerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.active as i32)?;

        for v in self.float_fields() {
            write!(f, ",{:.6}", v)?;
        }

        write!(f, ",{}", self.timestamp_ns)
    }
}

impl FromStr for SteerRecord {
    type Err = TmParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.trim().split(',').collect();

        if fields.len() != NUM_FIELDS {
            return Err(TmParseError::WrongFieldCount(fields.len()));
        }

        let invalid = |i: usize| TmParseError::InvalidField(i, fields[i].to_string());

        let active = fields[0].parse::<i32>().map_err(|_| invalid(0))? != 0;
        let timestamp_ns = fields[NUM_FIELDS - 1]
            .parse::<i64>()
            .map_err(|_| invalid(NUM_FIELDS - 1))?;

        let mut floats = Vec::with_capacity(NUM_FIELDS - 2);
        for i in 1..(NUM_FIELDS - 1) {
            floats.push(fields[i].parse::<f64>().map_err(|_| invalid(i))?);
        }

        let poly = |start: usize| {
            let mut p = [0f64; POLY_LEN];
            p.copy_from_slice(&floats[start..start + POLY_LEN]);
            p
        };

        let mut d_poly = [0f64; D_POLY_LEN];
        d_poly.copy_from_slice(&floats[28..28 + D_POLY_LEN]);

        Ok(Self {
            active,
            delta_desired: floats[0],
            angle_offset: floats[1],
            angle_steers_des: floats[2],
            steer_ratio: floats[3],
            scaled_kf: floats[4],
            scaled_kp: floats[5],
            scaled_ki: floats[6],
            steer_rate_cost: floats[7],
            l_prob: floats[8],
            r_prob: floats[9],
            c_prob: floats[10],
            p_prob: floats[11],
            l_poly: poly(12),
            r_poly: poly(16),
            p_poly: poly(20),
            c_poly: poly(24),
            d_poly,
            lane_width: floats[31],
            lane_width_estimate: floats[32],
            lane_width_certainty: floats[33],
            v_ego: floats[34],
            timestamp_ns,
        })
    }
}
