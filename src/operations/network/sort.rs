use tracing::debug;

use crate::error::{Incompatibility, NetworkError, Result};
use crate::geometry::{Curve, CurveDomain, NetworkCurve};

use super::grid::intersect_all;
use super::CurveNetwork;

/// Where a curve ended up after sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurveOrder {
    /// Index of the curve in the input network.
    pub index: usize,
    /// Whether the curve was reversed.
    pub reversed: bool,
}

/// The permutation applied by [`SortCurveNetwork`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkOrdering {
    /// Input profile for each sorted position.
    pub profiles: Vec<CurveOrder>,
    /// Input guide for each sorted position.
    pub guides: Vec<CurveOrder>,
}

/// Reorders and reverses the curves of a network so that intersection
/// parameters increase along every curve.
///
/// Looks for a profile and guide that both start at their common corner (or
/// a profile that starts where a guide ends, reversing the guide), moves that
/// corner to index 0, then sorts each family by its parameters along the
/// first curve of the other family and reverses curves that run backwards.
pub struct SortCurveNetwork<'a> {
    network: &'a CurveNetwork,
}

impl<'a> SortCurveNetwork<'a> {
    /// Creates a new `SortCurveNetwork` operation.
    #[must_use]
    pub fn new(network: &'a CurveNetwork) -> Self {
        Self { network }
    }

    /// Executes the sort, returning the sorted network and the ordering.
    ///
    /// # Errors
    ///
    /// Returns [`Incompatibility::NoStartCorner`] if no curve pair shares a
    /// start corner.
    pub fn execute(&self) -> Result<(CurveNetwork, NetworkOrdering)> {
        let profiles = self.network.profiles();
        let guides = self.network.guides();
        let n = guides.len();
        let flat = intersect_all(profiles, guides)?;
        let u: Vec<Vec<f64>> = flat.chunks(n).map(|row| row.iter().map(|x| x.t1).collect()).collect();
        let v: Vec<Vec<f64>> = flat.chunks(n).map(|row| row.iter().map(|x| x.t2).collect()).collect();
        let domains: Vec<CurveDomain> = guides.iter().map(Curve::domain).collect();

        let ordering = order_network(u, v, &domains)?;
        debug!(?ordering, "curve network sorted");

        let pick = |curves: &[NetworkCurve], order: &[CurveOrder]| -> Vec<NetworkCurve> {
            order
                .iter()
                .map(|o| {
                    if o.reversed {
                        curves[o.index].reversed()
                    } else {
                        curves[o.index].clone()
                    }
                })
                .collect()
        };
        let sorted = CurveNetwork::new(pick(profiles, &ordering.profiles), pick(guides, &ordering.guides))?;
        Ok((sorted, ordering))
    }
}

/// Sorts a network given by its intersection parameters.
///
/// `u[i][j]` is the parameter on profile `i` and `v[i][j]` the parameter on
/// guide `j` at their intersection.
fn order_network(
    mut u: Vec<Vec<f64>>,
    mut v: Vec<Vec<f64>>,
    guide_domains: &[CurveDomain],
) -> Result<NetworkOrdering> {
    let n_profiles = u.len();
    let n_guides = u.first().map_or(0, Vec::len);
    let mut profiles: Vec<CurveOrder> = (0..n_profiles)
        .map(|index| CurveOrder { index, reversed: false })
        .collect();
    let mut guides: Vec<CurveOrder> = (0..n_guides)
        .map(|index| CurveOrder { index, reversed: false })
        .collect();

    let (i, j, reverse_guide) =
        start_corner(&u, &v).ok_or(NetworkError::from(Incompatibility::NoStartCorner))?;
    if reverse_guide {
        let domain = guide_domains[j];
        for row in &mut v {
            row[j] = domain.t_min + domain.t_max - row[j];
        }
        guides[j].reversed = true;
    }
    u.swap(0, i);
    v.swap(0, i);
    profiles.swap(0, i);
    for row in u.iter_mut().chain(v.iter_mut()) {
        row.swap(0, j);
    }
    guides.swap(0, j);

    let mut columns: Vec<usize> = (0..n_guides).collect();
    columns.sort_by(|&a, &b| u[0][a].total_cmp(&u[0][b]));
    let permute = |row: &Vec<f64>| columns.iter().map(|&c| row[c]).collect::<Vec<f64>>();
    u = u.iter().map(permute).collect();
    v = v.iter().map(permute).collect();
    guides = columns.iter().map(|&c| guides[c]).collect();

    let mut rows: Vec<usize> = (0..n_profiles).collect();
    rows.sort_by(|&a, &b| v[a][0].total_cmp(&v[b][0]));
    u = rows.iter().map(|&r| u[r].clone()).collect();
    v = rows.iter().map(|&r| v[r].clone()).collect();
    profiles = rows.iter().map(|&r| profiles[r]).collect();

    for (row, order) in u.iter().zip(&mut profiles) {
        if row[0] > row[n_guides - 1] {
            order.reversed = !order.reversed;
        }
    }
    for (c, order) in guides.iter_mut().enumerate() {
        if v[0][c] > v[n_profiles - 1][c] {
            order.reversed = !order.reversed;
        }
    }

    Ok(NetworkOrdering { profiles, guides })
}

/// A profile `i` and guide `j` meeting where the profile starts.
///
/// Prefers a guide that also starts there; otherwise accepts one that ends
/// there, flagged for reversal.
fn start_corner(u: &[Vec<f64>], v: &[Vec<f64>]) -> Option<(usize, usize, bool)> {
    let arg = |values: &mut dyn Iterator<Item = f64>, max: bool| -> Option<usize> {
        values
            .enumerate()
            .reduce(|best, item| {
                let better = if max { item.1 > best.1 } else { item.1 < best.1 };
                if better {
                    item
                } else {
                    best
                }
            })
            .map(|(k, _)| k)
    };
    let starts: Vec<Option<usize>> = u.iter().map(|row| arg(&mut row.iter().copied(), false)).collect();

    for reverse in [false, true] {
        for (i, start) in starts.iter().enumerate() {
            let Some(j) = *start else { continue };
            if arg(&mut v.iter().map(|row| row[j]), reverse) == Some(i) {
                return Some((i, j, reverse));
            }
        }
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::context::{InterpolationContext, InterpolationParams};
    use crate::error::GordonError;
    use crate::operations::network::tests::line;
    use crate::operations::network::{FindIntersections, ValidateNetwork};

    fn order(index: usize, reversed: bool) -> CurveOrder {
        CurveOrder { index, reversed }
    }

    fn unit_domains(n: usize) -> Vec<CurveDomain> {
        vec![CurveDomain::new(0.0, 1.0); n]
    }

    #[test]
    fn corner_in_the_middle() {
        let u = vec![vec![0.0, 0.4, 1.0], vec![1.0, 0.2, 0.0], vec![1.0, 0.7, 0.0]];
        let v = vec![vec![0.5, 0.4, 0.3], vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 1.0]];
        assert_eq!(start_corner(&u, &v), Some((1, 2, false)));
        let ordering = order_network(u, v, &unit_domains(3)).unwrap();
        assert_eq!(ordering.profiles, vec![order(1, false), order(0, true), order(2, false)]);
        assert_eq!(ordering.guides, vec![order(2, false), order(1, false), order(0, true)]);
    }

    #[test]
    fn corner_needs_reversed_guide() {
        let u = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.0, 1.0]];
        let v = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.5, 0.6]];
        assert_eq!(start_corner(&u, &v), Some((0, 1, true)));
        let ordering = order_network(u, v, &unit_domains(2)).unwrap();
        assert_eq!(ordering.profiles, vec![order(0, false), order(2, true), order(1, true)]);
        assert_eq!(ordering.guides, vec![order(1, true), order(0, false)]);
    }

    #[test]
    fn missing_corner_is_an_error() {
        let u = vec![vec![0.0, 0.5, 1.0], vec![0.5, 0.0, 1.0], vec![0.5, 1.0, 0.0]];
        let v = vec![vec![0.5, 0.0, 0.0], vec![0.0, 0.5, 1.0], vec![1.0, 1.0, 0.5]];
        assert_eq!(start_corner(&u, &v), None);
        let err = order_network(u, v, &unit_domains(3)).unwrap_err();
        assert!(matches!(
            err,
            GordonError::Network(NetworkError::IncompatibleNetwork(Incompatibility::NoStartCorner))
        ));
    }

    #[test]
    fn sorted_square_validates() {
        let network = CurveNetwork::new(
            vec![line((1.0, 1.0, 0.0), (0.0, 1.0, 0.0)), line((0.0, 0.0, 0.0), (1.0, 0.0, 0.0))],
            vec![line((1.0, 0.0, 0.0), (1.0, 1.0, 0.0)), line((0.0, 1.0, 0.0), (0.0, 0.0, 0.0))],
        )
        .unwrap();
        let ctx = InterpolationContext::new(InterpolationParams::default(), network.profiles(), network.guides())
            .unwrap();

        let (_, grid) = FindIntersections::new(&network).execute(&ctx).unwrap();
        assert!(ValidateNetwork::new(&grid, ctx.tolerance()).execute().is_err());

        let (sorted, ordering) = SortCurveNetwork::new(&network).execute().unwrap();
        assert_eq!(ordering.profiles, vec![order(0, false), order(1, true)]);
        assert_eq!(ordering.guides, vec![order(0, true), order(1, false)]);
        let (_, grid) = FindIntersections::new(&sorted).execute(&ctx).unwrap();
        assert!(ValidateNetwork::new(&grid, ctx.tolerance()).execute().is_ok());
    }
}
