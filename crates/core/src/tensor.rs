//! Scalar type and low-level array helpers.

use ndarray::{ArrayBase, Data, DataMut, Dimension};

/// Scalar type (f64 by default, f32 with feature flag).
#[cfg(not(feature = "f32"))]
pub type Scalar = f64;

/// Scalar type (f64 by default, f32 with feature flag).
#[cfg(feature = "f32")]
pub type Scalar = f32;

/// Compute the L2 norm of an array, handling NaN/inf.
pub fn l2_norm<S, D>(t: &ArrayBase<S, D>) -> f64
where
    S: Data<Elem = Scalar>,
    D: Dimension,
{
    let mut sum_sq: f64 = 0.0;
    for &v in t.iter() {
        let v = v as f64;
        if v.is_nan() {
            return f64::NAN;
        }
        if !v.is_finite() {
            return f64::INFINITY;
        }
        sum_sq += v * v;
    }
    sum_sq.sqrt()
}

/// Squared L2 distance between two same-shaped arrays.
pub fn squared_l2_distance<S, T, D>(a: &ArrayBase<S, D>, b: &ArrayBase<T, D>) -> f64
where
    S: Data<Elem = Scalar>,
    T: Data<Elem = Scalar>,
    D: Dimension,
{
    assert_eq!(
        a.shape(),
        b.shape(),
        "array shapes must match for distance computation"
    );
    let mut sum_sq: f64 = 0.0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let d = (x as f64) - (y as f64);
        sum_sq += d * d;
    }
    sum_sq
}

/// Replace NaN and infinite values in-place.
pub fn sanitize<S, D>(t: &mut ArrayBase<S, D>, nan_val: Scalar, inf_val: Scalar)
where
    S: DataMut<Elem = Scalar>,
    D: Dimension,
{
    t.mapv_inplace(|x| {
        if x.is_nan() {
            nan_val
        } else if x.is_infinite() {
            if x.is_sign_negative() {
                -inf_val
            } else {
                inf_val
            }
        } else {
            x
        }
    });
}
