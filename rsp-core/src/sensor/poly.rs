//! Monomial kernel shared by the RPC direct and inverse rational maps.
//!
//! Every RPC numerator/denominator is a dot product of 20 fixed-form
//! coefficients against a 20-term monomial vector built from three
//! normalized inputs. This module owns that vector and its two partial
//! derivative tables so the evaluator and the analytic Jacobian draw from
//! one shared term ordering instead of duplicating it.

/// Number of terms in an RPC rational polynomial.
pub const NUM_TERMS: usize = 20;

/// One term: `coefficient * a^exp_a * b^exp_b * c^exp_c`.
type Term = (f64, i32, i32, i32);

/// term[i] = 1 * a^dx * b^dy * c^dz, in RPC/NITF standard order.
const TERM_ORDER: [Term; NUM_TERMS] = [
    (1.0, 0, 0, 0),
    (1.0, 1, 0, 0),
    (1.0, 0, 1, 0),
    (1.0, 0, 0, 1),
    (1.0, 1, 1, 0),
    (1.0, 1, 0, 1),
    (1.0, 0, 1, 1),
    (1.0, 2, 0, 0),
    (1.0, 0, 2, 0),
    (1.0, 0, 0, 2),
    (1.0, 1, 1, 1),
    (1.0, 3, 0, 0),
    (1.0, 1, 2, 0),
    (1.0, 1, 0, 2),
    (1.0, 2, 1, 0),
    (1.0, 0, 3, 0),
    (1.0, 0, 1, 2),
    (1.0, 2, 0, 1),
    (1.0, 0, 2, 1),
    (1.0, 0, 0, 3),
];

/// partial derivative of each term w.r.t. `a`.
const DERIV_A: [Term; NUM_TERMS] = [
    (0.0, 0, 0, 0),
    (1.0, 0, 0, 0),
    (0.0, 0, 1, 0),
    (0.0, 0, 0, 1),
    (1.0, 0, 1, 0),
    (1.0, 0, 0, 1),
    (0.0, 0, 1, 1),
    (2.0, 1, 0, 0),
    (0.0, 0, 2, 0),
    (0.0, 0, 0, 2),
    (1.0, 0, 1, 1),
    (3.0, 2, 0, 0),
    (1.0, 0, 2, 0),
    (1.0, 0, 0, 2),
    (2.0, 1, 1, 0),
    (0.0, 0, 3, 0),
    (0.0, 0, 1, 2),
    (2.0, 1, 0, 1),
    (0.0, 0, 2, 1),
    (0.0, 0, 0, 3),
];

/// partial derivative of each term w.r.t. `b`.
const DERIV_B: [Term; NUM_TERMS] = [
    (0.0, 0, 0, 0),
    (0.0, 1, 0, 0),
    (1.0, 0, 0, 0),
    (0.0, 0, 0, 1),
    (1.0, 1, 0, 0),
    (0.0, 1, 0, 1),
    (1.0, 0, 0, 1),
    (0.0, 2, 0, 0),
    (2.0, 0, 1, 0),
    (0.0, 0, 0, 2),
    (1.0, 1, 0, 1),
    (0.0, 3, 0, 0),
    (2.0, 1, 1, 0),
    (0.0, 1, 0, 2),
    (1.0, 2, 0, 0),
    (3.0, 0, 2, 0),
    (1.0, 0, 0, 2),
    (0.0, 2, 0, 1),
    (2.0, 0, 1, 1),
    (0.0, 0, 0, 3),
];

fn eval(table: &[Term; NUM_TERMS], a: f64, b: f64, c: f64) -> [f64; NUM_TERMS] {
    let mut out = [0.0; NUM_TERMS];
    for (i, &(coeff, da, db, dc)) in table.iter().enumerate() {
        out[i] = coeff * a.powi(da) * b.powi(db) * c.powi(dc);
    }
    out
}

/// Build the 20-term monomial vector for normalized inputs (a, b, c).
pub fn monomials(a: f64, b: f64, c: f64) -> [f64; NUM_TERMS] {
    eval(&TERM_ORDER, a, b, c)
}

/// ∂/∂a of each term, evaluated at (a, b, c).
pub fn monomials_deriv_a(a: f64, b: f64, c: f64) -> [f64; NUM_TERMS] {
    eval(&DERIV_A, a, b, c)
}

/// ∂/∂b of each term, evaluated at (a, b, c).
pub fn monomials_deriv_b(a: f64, b: f64, c: f64) -> [f64; NUM_TERMS] {
    eval(&DERIV_B, a, b, c)
}

/// Dot product of a coefficient vector with a monomial vector.
pub fn dot(coeffs: &[f64; NUM_TERMS], m: &[f64; NUM_TERMS]) -> f64 {
    coeffs.iter().zip(m.iter()).map(|(c, v)| c * v).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_term_only_at_origin() {
        let m = monomials(0.0, 0.0, 0.0);
        assert_eq!(m[0], 1.0);
        for &v in &m[1..] {
            assert_eq!(v, 0.0);
        }
    }

    #[test]
    fn known_point() {
        let m = monomials(2.0, 3.0, 5.0);
        assert_eq!(m[0], 1.0); // 1
        assert_eq!(m[1], 2.0); // a
        assert_eq!(m[2], 3.0); // b
        assert_eq!(m[3], 5.0); // c
        assert_eq!(m[4], 6.0); // ab
        assert_eq!(m[7], 4.0); // a^2
        assert_eq!(m[11], 8.0); // a^3
        assert_eq!(m[19], 125.0); // c^3
    }

    #[test]
    fn deriv_a_matches_finite_difference() {
        let (a, b, c) = (0.3, -0.2, 0.1);
        let h = 1e-6;
        let m_plus = monomials(a + h, b, c);
        let m_minus = monomials(a - h, b, c);
        let analytic = monomials_deriv_a(a, b, c);
        for i in 0..NUM_TERMS {
            let numeric = (m_plus[i] - m_minus[i]) / (2.0 * h);
            assert!((numeric - analytic[i]).abs() < 1e-4, "term {i}: {numeric} vs {analytic_i}", analytic_i = analytic[i]);
        }
    }

    #[test]
    fn deriv_b_matches_finite_difference() {
        let (a, b, c) = (0.3, -0.2, 0.1);
        let h = 1e-6;
        let m_plus = monomials(a, b + h, c);
        let m_minus = monomials(a, b - h, c);
        let analytic = monomials_deriv_b(a, b, c);
        for i in 0..NUM_TERMS {
            let numeric = (m_plus[i] - m_minus[i]) / (2.0 * h);
            assert!((numeric - analytic[i]).abs() < 1e-4, "term {i}: {numeric} vs {analytic_i}", analytic_i = analytic[i]);
        }
    }

    #[test]
    fn dot_product() {
        let coeffs = [1.0; NUM_TERMS];
        let m = monomials(0.0, 0.0, 0.0);
        assert_eq!(dot(&coeffs, &m), 1.0);
    }
}
