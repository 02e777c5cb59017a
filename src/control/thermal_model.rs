//! Fitted thermal model: room demand → boiler supply-water temperature.
//!
//! A 14-term polynomial in heating parameter (`hp`), room setpoint (`sp`) and
//! outside temperature (`ot`), calibrated offline.  The table below is
//! load-bearing; do not touch a coefficient without refitting all of them.
//!
//! The model does not clamp.  Callers apply [`bound`].

/// Upper limit for any commanded supply temperature (°C).
pub const MAX_TSET: f64 = 75.0;

/// Below this a commanded temperature is pointless for the boiler.
pub const MIN_TSET: f64 = 20.0;

/// Value substituted for anything below [`MIN_TSET`].
pub const FALLBACK_TSET: f64 = 10.0;

/// One polynomial term: `coefficient * hp^hp_exp * sp^sp_exp * ot^ot_exp`.
#[derive(Debug, Clone, Copy)]
struct Term {
    coefficient: f64,
    hp_exp: i32,
    sp_exp: i32,
    ot_exp: i32,
}

const fn term(coefficient: f64, hp_exp: i32, sp_exp: i32, ot_exp: i32) -> Term {
    Term {
        coefficient,
        hp_exp,
        sp_exp,
        ot_exp,
    }
}

const TERMS: [Term; 14] = [
    term(1.665451e-04, 2, 0, 0),
    term(-6.595542e-04, 1, 2, 0),
    term(1.326216e-03, 1, 1, 1),
    term(1.243637e-01, 1, 1, 0),
    term(-6.933021e-04, 1, 0, 2),
    term(-1.242895e-01, 1, 0, 1),
    term(6.221294e-02, 1, 0, 0),
    term(-7.483894e-05, 0, 3, 0),
    term(5.947953e-03, 0, 2, 0),
    term(-4.194166e-03, 0, 1, 1),
    term(8.534580e-01, 0, 1, 0),
    term(2.610415e-03, 0, 0, 2),
    term(7.909183e-02, 0, 0, 1),
    term(-1.989083e+00, 0, 0, 0),
];

/// Candidate supply-water temperature for one zone.
///
/// `_room` is accepted so callers pass the full zone state; the current fit
/// does not depend on it (room feedback enters through the corrected `hp`).
pub fn supply_temperature(hp: f64, setpoint: f64, outside: f64, _room: f64) -> f64 {
    TERMS
        .iter()
        .map(|t| {
            t.coefficient * hp.powi(t.hp_exp) * setpoint.powi(t.sp_exp) * outside.powi(t.ot_exp)
        })
        .sum()
}

/// Clamp to [`MAX_TSET`]; anything under [`MIN_TSET`] snaps to
/// [`FALLBACK_TSET`] rather than to the threshold.
pub fn bound(tset: f64) -> f64 {
    let capped = tset.min(MAX_TSET);
    if capped < MIN_TSET {
        FALLBACK_TSET
    } else {
        capped
    }
}
