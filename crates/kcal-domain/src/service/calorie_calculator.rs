//! Calorie calculation from measured volume and food priors

use kcal_types::{FoodPriors, GeometryEstimate, VolumeEstimate};

/// Floor on the propagated calorie sigma
pub const MIN_GEOMETRY_SIGMA_KCAL: f64 = 10.0;

/// Mean and sigma of `C = V * density * kcal_per_g`.
///
/// Sigma uses first-order (delta method) propagation of the three
/// independent uncertainties, floored at [`MIN_GEOMETRY_SIGMA_KCAL`].
/// Volume is in mL, density in g/mL, energy density in kcal/g.
pub fn calories_from_geometry(volume: &VolumeEstimate, priors: &FoodPriors) -> (f64, f64) {
    let v = volume.mu_ml;
    let rho = priors.density.mu;
    let e = priors.kcal_per_g.mu;

    let mu = v * rho * e;

    let d_dv = rho * e;
    let d_drho = v * e;
    let d_de = v * rho;

    let variance = (d_dv * volume.sigma_ml).powi(2)
        + (d_drho * priors.density.sigma).powi(2)
        + (d_de * priors.kcal_per_g.sigma).powi(2);

    (mu, variance.sqrt().max(MIN_GEOMETRY_SIGMA_KCAL))
}

pub fn geometry_estimate(
    label: impl Into<String>,
    volume: &VolumeEstimate,
    priors: &FoodPriors,
) -> GeometryEstimate {
    let (calories, sigma) = calories_from_geometry(volume, priors);
    GeometryEstimate {
        label: label.into(),
        volume_ml: volume.mu_ml,
        calories,
        sigma,
        evidence: vec!["Geometry".to_string(), "Priors".to_string()],
    }
}
