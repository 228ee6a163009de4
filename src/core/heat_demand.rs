//! SigLinDe standard-load-profile heat demand model: a sigmoid plus linear
//! term maps the daily mean ambient temperature to an unscaled daily thermal
//! energy demand for a building class, and a fixed hour-of-day weight table
//! (one column per mean-temperature band) splits that figure over the day.

#![allow(non_snake_case)]

use anyhow::anyhow;
use csv::Reader;
use indexmap::IndexMap;
use serde::Deserialize;
use std::io::{BufReader, Cursor};

const DEFAULT_REFERENCE_TEMP: f64 = 40.;

lazy_static! {
    static ref BUILDING_PARAMETERS: IndexMap<String, BuildingParameters> = {
        let mut parameters: IndexMap<String, BuildingParameters> = Default::default();

        let mut reader = Reader::from_reader(BufReader::new(Cursor::new(include_str!(
            "./siglinde_building_parameters.csv"
        ))));
        for row in reader.deserialize() {
            let row: BuildingParameters =
                row.expect("Reading the SigLinDe building parameters file failed.");
            parameters.insert(row.building_type.clone(), row);
        }

        parameters
    };
    static ref HOURLY_DISTRIBUTION: [[f64; 24]; 10] = {
        let mut weights = [[0.; 24]; 10];

        let mut reader = Reader::from_reader(BufReader::new(Cursor::new(include_str!(
            "./hourly_heat_demand_distribution.csv"
        ))));
        for row in reader.deserialize() {
            let row: HourlyDistributionRow =
                row.expect("Reading the hourly heat demand distribution file failed.");
            for (band, weight) in row.weights().into_iter().enumerate() {
                weights[band][row.hour] = weight;
            }
        }

        weights
    };
}

/// One row of the SigLinDe parameter table: sigmoid coefficients `A..D` and
/// the space-heating/hot-water linear segments `(m_H, b_H)` / `(m_W, b_W)`.
#[derive(Clone, Debug, Deserialize)]
pub struct BuildingParameters {
    pub building_type: String,
    #[serde(rename = "A")]
    pub a: f64,
    #[serde(rename = "B")]
    pub b: f64,
    #[serde(rename = "C")]
    pub c: f64,
    #[serde(rename = "D")]
    pub d: f64,
    pub m_H: f64,
    pub b_H: f64,
    pub m_W: f64,
    pub b_W: f64,
}

#[derive(Debug, Deserialize)]
struct HourlyDistributionRow {
    hour: usize,
    le_minus_15: f64,
    minus_15_to_minus_10: f64,
    minus_10_to_minus_5: f64,
    minus_5_to_0: f64,
    #[serde(rename = "0_to_5")]
    zero_to_5: f64,
    #[serde(rename = "5_to_10")]
    five_to_10: f64,
    #[serde(rename = "10_to_15")]
    ten_to_15: f64,
    #[serde(rename = "15_to_20")]
    fifteen_to_20: f64,
    #[serde(rename = "20_to_25")]
    twenty_to_25: f64,
    gt_25: f64,
}

impl HourlyDistributionRow {
    /// Band weights in table order, coldest first.
    fn weights(&self) -> [f64; 10] {
        [
            self.le_minus_15,
            self.minus_15_to_minus_10,
            self.minus_10_to_minus_5,
            self.minus_5_to_0,
            self.zero_to_5,
            self.five_to_10,
            self.ten_to_15,
            self.fifteen_to_20,
            self.twenty_to_25,
            self.gt_25,
        ]
    }
}

/// Mean-temperature bands of the hourly distribution table, coldest first.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TemperatureBand {
    LeMinus15,
    Minus15ToMinus10,
    Minus10ToMinus5,
    Minus5To0,
    ZeroTo5,
    FiveTo10,
    TenTo15,
    FifteenTo20,
    TwentyTo25,
    Above25,
}

impl TemperatureBand {
    /// Band for a daily mean temperature; upper bounds are inclusive.
    pub fn for_daily_mean(temp: f64) -> Self {
        match temp {
            t if t <= -15. => Self::LeMinus15,
            t if t <= -10. => Self::Minus15ToMinus10,
            t if t <= -5. => Self::Minus10ToMinus5,
            t if t <= 0. => Self::Minus5To0,
            t if t <= 5. => Self::ZeroTo5,
            t if t <= 10. => Self::FiveTo10,
            t if t <= 15. => Self::TenTo15,
            t if t <= 20. => Self::FifteenTo20,
            t if t <= 25. => Self::TwentyTo25,
            _ => Self::Above25,
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// A SigLinDe model instantiated for one building class.
#[derive(Clone, Debug)]
pub struct HeatDemandModel {
    parameters: BuildingParameters,
    reference_temp: f64,
}

impl HeatDemandModel {
    /// Select the parameter row for a building type. An unknown type is a
    /// configuration fault, surfaced immediately.
    ///
    /// Arguments:
    /// * `building_type` - key into the SigLinDe parameter table, e.g. "DE_HEF33"
    /// * `reference_temp` - the sigmoid reference temperature `t_0`, in deg C
    ///   (40 by default)
    pub fn for_building_type(
        building_type: &str,
        reference_temp: Option<f64>,
    ) -> anyhow::Result<Self> {
        let parameters = BUILDING_PARAMETERS
            .get(building_type)
            .cloned()
            .ok_or_else(|| {
                anyhow!(
                    "unknown building type '{building_type}' (known types: {})",
                    BUILDING_PARAMETERS.keys().cloned().collect::<Vec<_>>().join(", ")
                )
            })?;
        Ok(Self {
            parameters,
            reference_temp: reference_temp.unwrap_or(DEFAULT_REFERENCE_TEMP),
        })
    }

    pub fn parameters(&self) -> &BuildingParameters {
        &self.parameters
    }

    /// Unscaled daily demand for a day with the given mean temperature:
    /// sigmoid share plus the larger of the space-heating and hot-water
    /// linear segments.
    pub fn daily_demand(&self, daily_mean_temp: f64) -> f64 {
        let BuildingParameters {
            a,
            b,
            c,
            d,
            m_H,
            b_H,
            m_W,
            b_W,
            ..
        } = self.parameters;
        let heating = m_H * daily_mean_temp + b_H;
        let hot_water = m_W * daily_mean_temp + b_W;
        a / (1. + (b / (daily_mean_temp - self.reference_temp)).powf(c))
            + d
            + heating.max(hot_water)
    }

    /// The 24 hour-of-day weights for a day with the given mean temperature.
    /// Each weight row sums to 1.
    pub fn hourly_weights(daily_mean_temp: f64) -> &'static [f64; 24] {
        &HOURLY_DISTRIBUTION[TemperatureBand::for_daily_mean(daily_mean_temp).index()]
    }
}
