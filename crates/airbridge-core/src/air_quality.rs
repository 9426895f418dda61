// ── Air quality classification ──
//
// An ordered rule table maps raw pm25 / tvoc / co2 readings onto a
// qualitative level. Rules are tried in order and the first match wins.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::model::{ReadingKind, Readings};

/// Qualitative air quality, in ascending severity.
///
/// Discriminants match the usual smart-home `AirQuality` characteristic,
/// where 0 means the level could not be determined.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
#[repr(u8)]
pub enum AirQualityLevel {
    #[default]
    Unknown = 0,
    Excellent = 1,
    Good = 2,
    Fair = 3,
    Inferior = 4,
    Poor = 5,
}

impl AirQualityLevel {
    #[allow(clippy::as_conversions)]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Direction of a rule's comparison. Both are strict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Under,
    Over,
}

/// One row of the rule table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityRule {
    pub comparison: Comparison,
    pub thresholds: Vec<(ReadingKind, f64)>,
    pub level: AirQualityLevel,
}

impl AirQualityRule {
    pub fn under(thresholds: &[(ReadingKind, f64)], level: AirQualityLevel) -> Self {
        Self {
            comparison: Comparison::Under,
            thresholds: thresholds.to_vec(),
            level,
        }
    }

    pub fn over(thresholds: &[(ReadingKind, f64)], level: AirQualityLevel) -> Self {
        Self {
            comparison: Comparison::Over,
            thresholds: thresholds.to_vec(),
            level,
        }
    }

    /// Every named kind must be present and on the right side of its
    /// threshold. An absent kind fails the rule.
    pub fn matches(&self, readings: &Readings) -> bool {
        self.thresholds.iter().all(|&(kind, threshold)| {
            readings.get(kind).is_some_and(|value| match self.comparison {
                Comparison::Under => value < threshold,
                Comparison::Over => value > threshold,
            })
        })
    }
}

/// First-match classifier over an ordered rule list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityClassifier {
    rules: Vec<AirQualityRule>,
}

impl Default for AirQualityClassifier {
    fn default() -> Self {
        use AirQualityLevel::{Excellent, Fair, Good, Inferior, Poor};
        use ReadingKind::{Co2, Pm25, Tvoc};

        Self::new(vec![
            AirQualityRule::under(&[(Pm25, 12.0), (Tvoc, 65.0), (Co2, 1000.0)], Excellent),
            AirQualityRule::under(&[(Pm25, 35.0), (Tvoc, 220.0), (Co2, 1250.0)], Good),
            AirQualityRule::under(&[(Pm25, 55.0), (Tvoc, 660.0), (Co2, 1500.0)], Fair),
            AirQualityRule::under(&[(Pm25, 150.0), (Tvoc, 2000.0), (Co2, 2000.0)], Inferior),
            AirQualityRule::over(&[(Pm25, 150.0), (Tvoc, 2000.0), (Co2, 2000.0)], Poor),
        ])
    }
}

impl AirQualityClassifier {
    pub fn new(rules: Vec<AirQualityRule>) -> Self {
        Self { rules }
    }

    /// Level of the first matching rule, or `Unknown` when none match.
    pub fn classify(&self, readings: &Readings) -> AirQualityLevel {
        self.rules
            .iter()
            .find(|rule| rule.matches(readings))
            .map_or(AirQualityLevel::Unknown, |rule| rule.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReadingKind::{Co2, Pm25, Temperature, Tvoc};

    fn readings(values: &[(ReadingKind, f64)]) -> Readings {
        values.iter().copied().collect()
    }

    fn classify(values: &[(ReadingKind, f64)]) -> AirQualityLevel {
        AirQualityClassifier::default().classify(&readings(values))
    }

    #[test]
    fn clean_air_is_excellent() {
        assert_eq!(
            classify(&[(Pm25, 10.0), (Tvoc, 50.0), (Co2, 900.0)]),
            AirQualityLevel::Excellent
        );
    }

    #[test]
    fn thresholds_are_strict() {
        // 35 fails `< 35`, so the Good rule is skipped.
        assert_eq!(
            classify(&[(Pm25, 35.0), (Tvoc, 50.0), (Co2, 900.0)]),
            AirQualityLevel::Fair
        );
        assert_eq!(
            classify(&[(Pm25, 12.0), (Tvoc, 50.0), (Co2, 900.0)]),
            AirQualityLevel::Good
        );
    }

    #[test]
    fn worst_reading_decides() {
        assert_eq!(
            classify(&[(Pm25, 40.0), (Tvoc, 50.0), (Co2, 900.0)]),
            AirQualityLevel::Fair
        );
        assert_eq!(
            classify(&[(Pm25, 5.0), (Tvoc, 50.0), (Co2, 1800.0)]),
            AirQualityLevel::Inferior
        );
    }

    #[test]
    fn heavy_pollution_is_poor() {
        assert_eq!(
            classify(&[(Pm25, 200.0), (Tvoc, 2500.0), (Co2, 2500.0)]),
            AirQualityLevel::Poor
        );
    }

    #[test]
    fn no_readings_is_unknown() {
        assert_eq!(classify(&[]), AirQualityLevel::Unknown);
        assert_eq!(classify(&[(Temperature, 21.0)]), AirQualityLevel::Unknown);
    }

    #[test]
    fn missing_kind_fails_under_rules() {
        // A Lite has no tvoc sensor; every rule names tvoc.
        assert_eq!(
            classify(&[(Pm25, 3.0), (Co2, 450.0)]),
            AirQualityLevel::Unknown
        );
    }

    #[test]
    fn mixed_extremes_match_nothing() {
        // Over needs every kind above its bound, so a lone pm25 spike
        // past the Inferior bounds matches nothing.
        assert_eq!(
            classify(&[(Pm25, 200.0), (Tvoc, 50.0), (Co2, 900.0)]),
            AirQualityLevel::Unknown
        );
    }

    #[test]
    fn custom_rule_tables_are_honoured() {
        let classifier = AirQualityClassifier::new(vec![AirQualityRule::over(
            &[(Co2, 800.0)],
            AirQualityLevel::Poor,
        )]);
        assert_eq!(
            classifier.classify(&readings(&[(Co2, 801.0)])),
            AirQualityLevel::Poor
        );
        assert_eq!(
            classifier.classify(&readings(&[(Co2, 800.0)])),
            AirQualityLevel::Unknown
        );
    }

    #[test]
    fn level_codes() {
        assert_eq!(AirQualityLevel::Unknown.as_u8(), 0);
        assert_eq!(AirQualityLevel::Poor.as_u8(), 5);
    }
}
