//! Wing demo: interpolates a tapered, cambered wing from its section and
//! spanwise curves and reports how closely the surface follows them.
//!
//! Usage:
//! ```text
//! cargo run --example wing
//! cargo run --example wing --features parallel
//! RUST_LOG=gordon=debug cargo run --example wing
//! ```

use std::f64::consts::PI;

use gordon::geometry::{Curve, NetworkCurve, Surface};
use gordon::math::{linspace, Point3};
use gordon::operations::creation::InterpolateCurve;
use gordon::{GordonError, InterpolateCurveNetwork, InterpolationParams};

/// Point at chord fraction `s` of the section at span `z`.
fn wing(s: f64, z: f64) -> Point3 {
    let chord = 2.0 - 0.4 * z;
    let camber = 0.12 * chord * (PI * s).sin() * (1.0 - 0.2 * z);
    Point3::new(0.3 * z + chord * s, camber, z)
}

fn curve_through(points: &[Point3]) -> Result<NetworkCurve, GordonError> {
    let params = linspace(0.0, 1.0, points.len());
    Ok(InterpolateCurve::new(points, &params, 3).execute()?.into())
}

fn main() -> Result<(), GordonError> {
    // Default: WARN for everything, INFO for gordon.
    // Override with RUST_LOG env var (e.g. RUST_LOG=gordon=debug).
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("wing=info".parse().unwrap_or_default())
        .add_directive("gordon=info".parse().unwrap_or_default());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    // Guides sit on chord stations and profiles on span stations, so every
    // pair shares an exact crossing point.
    let chord_stations = linspace(0.0, 1.0, 9);
    let span_stations = linspace(0.0, 2.4, 7);
    let profile_spans = [0.0, 0.8, 1.6, 2.4];
    let guide_chords = [0.0, 0.25, 0.5, 1.0];

    let profiles = profile_spans
        .iter()
        .map(|&z| curve_through(&chord_stations.iter().map(|&s| wing(s, z)).collect::<Vec<_>>()))
        .collect::<Result<Vec<_>, _>>()?;
    let guides = guide_chords
        .iter()
        .map(|&s| curve_through(&span_stations.iter().map(|&z| wing(s, z)).collect::<Vec<_>>()))
        .collect::<Result<Vec<_>, _>>()?;

    let params = InterpolationParams {
        tolerance: 1e-5,
        ..InterpolationParams::default()
    };
    let result = InterpolateCurveNetwork::new(&profiles, &guides)
        .with_params(params)
        .execute()?;
    let surface = result.surface();

    println!(
        "surface: degree {} x {}, {} x {} control points",
        surface.degree_u(),
        surface.degree_v(),
        surface.control_points().len(),
        surface.control_points()[0].len()
    );
    println!("guide parameters (u):   {:.4?}", result.params_u());
    println!("profile parameters (v): {:.4?}", result.params_v());
    println!(
        "max reparametrization error: {:.3e}",
        result.max_reparametrization_error()
    );

    let mut worst: f64 = 0.0;
    for (profile, &v) in profiles.iter().zip(result.params_v()) {
        for t in linspace(0.0, 1.0, 50) {
            let on_surface = surface.evaluate(t, v)?;
            let nearest = linspace(0.0, 1.0, 2000)
                .into_iter()
                .map(|s| profile.evaluate(s).map(|p| (p - on_surface).norm()))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .fold(f64::INFINITY, f64::min);
            worst = worst.max(nearest);
        }
    }
    println!("largest sampled distance from a profile: {worst:.3e}");

    Ok(())
}
