//! Predictor evaluation.
//!
//! All arithmetic is done in `i64` so that no intermediate result can
//! overflow; the encoder narrows the final delta to the wire width.

use crate::fields::{FieldDefinition, Predictor};
use crate::history::{History, average2};

/// Session reference values used by the non-history predictors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct References {
    /// Battery voltage at session start, 0.01 V.
    pub vbat: u16,
    /// GPS home coordinate last written in an `H` frame.
    pub home: [i32; 2],
    /// Time of the last written main frame.
    pub last_main_frame_time: u32,
}

/// Where a predictor finds its previous values.
pub enum Basis<'a, S> {
    /// Frame without history (intra, slow, GPS, home).
    Standalone,
    /// Inter frame predicted from the last two logged snapshots.
    History(&'a History<S>),
}

impl<S> Clone for Basis<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Basis<'_, S> {}

/// Expected value of `def` under `predictor`.
///
/// History predictors evaluate to zero when `basis` carries no history, which
/// only happens if a catalog pairs them with a standalone frame.
pub fn predict<S>(
    predictor: Predictor,
    def: &FieldDefinition<S>,
    basis: Basis<'_, S>,
    refs: &References,
) -> i64 {
    match (predictor, basis) {
        (Predictor::Zero, _) => 0,
        (Predictor::Previous, Basis::History(h)) => def.read(h.previous()),
        (Predictor::StraightLine, Basis::History(h)) => {
            2 * def.read(h.previous()) - def.read(h.before_previous())
        }
        (Predictor::Average2, Basis::History(h)) => {
            average2(def.read(h.previous()), def.read(h.before_previous()))
        }
        (Predictor::Inc, Basis::History(h)) => def.read(h.previous()) + 1,
        (Predictor::HomeCoord, _) => {
            let axis = def.index.unwrap_or(0) as usize & 1;
            i64::from(refs.home[axis])
        }
        (Predictor::VbatRef, _) => i64::from(refs.vbat),
        (Predictor::LastMainFrameTime, _) => i64::from(refs.last_main_frame_time),
        (_, Basis::Standalone) => 0,
    }
}

/// Difference between the field value in `current` and its prediction.
#[inline]
pub fn delta<S>(
    predictor: Predictor,
    def: &FieldDefinition<S>,
    current: &S,
    basis: Basis<'_, S>,
    refs: &References,
) -> i64 {
    def.read(current) - predict(predictor, def, basis, refs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::MAIN_FIELDS;
    use crate::state::MainState;

    fn field(name: &str) -> &'static FieldDefinition<MainState> {
        MAIN_FIELDS.iter().find(|d| d.name == name).unwrap()
    }

    fn history(times: [u32; 2]) -> History<MainState> {
        let mut h: History<MainState> = History::new();
        for t in times {
            h.current_mut().time = t;
            h.current_mut().gyro_adc[0] = (t as i16) * -3;
            h.rotate_inter();
        }
        h
    }

    #[test]
    fn test_straight_line_time() {
        let h = history([1000, 2000]);
        let mut current = MainState::default();
        current.time = 3002;

        let def = field("time");
        let refs = References::default();
        assert_eq!(predict(Predictor::StraightLine, def, Basis::History(&h), &refs), 3000);
        assert_eq!(delta(Predictor::StraightLine, def, &current, Basis::History(&h), &refs), 2);
    }

    #[test]
    fn test_straight_line_wraps_like_u32() {
        let h = history([u32::MAX - 999, u32::MAX]);
        let mut current = MainState::default();
        current.time = 998;

        let d = delta(
            Predictor::StraightLine,
            field("time"),
            &current,
            Basis::History(&h),
            &References::default(),
        );
        assert_eq!(d as i32, 0);
    }

    #[test]
    fn test_average_predictor() {
        let h = history([1, 2]);
        let def = field("gyroADC");
        assert_eq!(
            predict(Predictor::Average2, def, Basis::History(&h), &References::default()),
            (-3 + -6) / 2
        );
    }

    #[test]
    fn test_reference_predictors() {
        let refs = References {
            vbat: 420,
            home: [100, -200],
            last_main_frame_time: 5000,
        };
        let mut current = MainState::default();
        current.vbat_latest = 415;

        let d = delta(Predictor::VbatRef, field("vbatLatest"), &current, Basis::Standalone, &refs);
        assert_eq!(d, -5);
        assert_eq!(predict(Predictor::LastMainFrameTime, field("time"), Basis::Standalone, &refs), 5000);
    }

    #[test]
    fn test_history_predictor_without_history() {
        let def = field("axisP");
        assert_eq!(
            predict(Predictor::Previous, def, Basis::Standalone, &References::default()),
            0
        );
    }
}
