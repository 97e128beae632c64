use std::f64::consts::PI;

use itertools::Itertools;
use log;
use nalgebra::Vector3;
use ndarray::{indices, Array1, Array3};
use num_complex::Complex;
use rayon::prelude::*;

use crate::symmetrisation::{SymmetrisationError, SymmetrisationGroup};

/// Maximum deviation from an integer tolerated for a rotated grid index.
const GRID_INDEX_THRESHOLD: f64 = 0.1;

/// The plane-wave layout of a reciprocal-space field.
#[derive(Clone, Debug)]
pub struct PlaneWaveGrid<'a> {
    /// For every point of the FFT box, the index of the plane wave stored there, or `None` if the
    /// point lies outside the plane-wave sphere.
    pub ixyz2ipw: &'a Array3<Option<usize>>,

    /// The dimensions `(nx, ny, nz)` of the full FFT grid, used for wrapping Miller indices.
    pub full_dims: (usize, usize, usize),

    /// Whether only half of the reciprocal space is stored, in which case rotations leaving the
    /// FFT box are ignored instead of being treated as errors.
    pub gamma_only: bool,
}

/// Converts a wrapped grid index into a signed Miller index.
fn signed_index(i: usize, n: usize) -> i64 {
    if i > n / 2 + 1 {
        i as i64 - n as i64
    } else {
        i as i64
    }
}

/// Symmetrises a real-space scalar field sampled on a grid commensurate with the group.
///
/// Every grid point is mapped with every operation; the field values at the images are averaged
/// and the average is written back to all images.
///
/// # Errors
///
/// Errors if the group is empty or if some operation does not map grid points onto grid points.
pub fn rho_symmetry(
    rho: &mut Array3<f64>,
    group: &SymmetrisationGroup,
) -> Result<(), SymmetrisationError> {
    group.ensure_nonempty()?;
    let (n1, n2, n3) = rho.dim();
    let dims = [n1, n2, n3];
    let scaled = group
        .operations
        .iter()
        .map(|op| {
            let mut w = op.rotation;
            for i in 0..3 {
                for j in 0..3 {
                    w[(i, j)] *= dims[i] as f64 / dims[j] as f64;
                }
            }
            let t = Vector3::new(
                op.translation[0] * n1 as f64,
                op.translation[1] * n2 as f64,
                op.translation[2] * n3 as f64,
            );
            if w
                .iter()
                .chain(t.iter())
                .any(|x| (x - x.round()).abs() > GRID_INDEX_THRESHOLD)
            {
                Err(SymmetrisationError(format!(
                    "the grid {n1}×{n2}×{n3} is incommensurate with the operation\n{op}"
                )))
            } else {
                Ok((w.map(|x| x.round() as i64), t.map(|x| x.round() as i64)))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut visited = Array3::from_elem((n1, n2, n3), false);
    let nops = scaled.len() as f64;
    for (i, j, k) in indices((n1, n2, n3)) {
        if visited[(i, j, k)] {
            continue;
        }
        let x = Vector3::new(i as i64, j as i64, k as i64);
        let images = scaled
            .iter()
            .map(|(w, t)| {
                let y = w * x + t;
                (
                    y[0].rem_euclid(n1 as i64) as usize,
                    y[1].rem_euclid(n2 as i64) as usize,
                    y[2].rem_euclid(n3 as i64) as usize,
                )
            })
            .collect_vec();
        let average = images.iter().map(|idx| rho[*idx]).sum::<f64>() / nops;
        for idx in images {
            rho[idx] = average;
            visited[idx] = true;
        }
    }
    Ok(())
}

/// One member of an orbit of reciprocal-lattice points.
#[derive(Clone, Copy, Debug)]
struct OrbitMember {
    /// The plane-wave index.
    ipw: usize,

    /// The Miller index.
    miller: Vector3<f64>,

    /// The index of the operation $`g^{-1}`$ that maps this member back onto the orbit origin.
    inverse_op: usize,
}

/// Symmetrises a reciprocal-space scalar field.
///
/// The field is expanded as $`\rho(\mathbf{x}) = \sum_{\mathbf{h}} c(\mathbf{h})
/// e^{2\pi i \mathbf{h} \cdot \mathbf{x}}`$. Invariance under $`\{\mathbf{W}|\mathbf{t}\}`$
/// requires $`c(\mathbf{W}^{\mathsf{T}}\mathbf{h}) = c(\mathbf{h})\, e^{2\pi i \mathbf{h} \cdot
/// \mathbf{t}}`$. Plane waves are grouped into orbits; within an orbit every member $`\mathbf{h}_g`$
/// gives an estimate $`c(\mathbf{h}_g)\, \phi_g`$ of the coefficient of the orbit origin, with
/// $`\phi_g = e^{2\pi i \mathbf{h}_g \cdot \mathbf{t}_{g^{-1}}} \langle e^{2\pi i \mathbf{h}_g
/// \cdot \mathbf{p}} \rangle_{\mathbf{p}}`$ averaged over the internal translations
/// $`\mathbf{p}`$. The estimates are averaged and every member receives the average divided by its
/// phase. Members whose averaged phase vanishes are left untouched.
///
/// Orbits are processed in parallel.
///
/// # Errors
///
/// Errors if the group is empty, or if a rotated Miller index falls outside the FFT box and
/// `gamma_only` is not set.
pub fn rhog_symmetry(
    rhog: &mut Array1<Complex<f64>>,
    grid: &PlaneWaveGrid,
    group: &SymmetrisationGroup,
) -> Result<(), SymmetrisationError> {
    group.ensure_nonempty()?;
    let tol = group.tolerance;
    let (nx, ny, nz) = grid.full_dims;
    let (fftnx, fftny, fftnz) = grid.ixyz2ipw.dim();
    let invmap = group.invmap();

    // Group the plane waves into orbits.
    let mut assigned = Array3::from_elem((fftnx, fftny, fftnz), false);
    let mut orbits: Vec<Vec<OrbitMember>> = vec![];
    for ((i, j, k), ipw0) in grid.ixyz2ipw.indexed_iter() {
        if assigned[(i, j, k)] || ipw0.is_none() {
            continue;
        }
        let h0 = Vector3::new(
            signed_index(i, nx) as f64,
            signed_index(j, ny) as f64,
            signed_index(k, nz) as f64,
        );
        let mut members = vec![];
        for inverse_op in invmap.iter().flatten() {
            let rotated = group.kgmatrix[*inverse_op] * h0;
            let ii = (rotated[0].round() as i64).rem_euclid(nx as i64) as usize;
            let jj = (rotated[1].round() as i64).rem_euclid(ny as i64) as usize;
            let kk = (rotated[2].round() as i64).rem_euclid(nz as i64) as usize;
            if ii >= fftnx || jj >= fftny || kk >= fftnz {
                if grid.gamma_only {
                    continue;
                }
                return Err(SymmetrisationError(format!(
                    "the rotated Miller index ({ii}, {jj}, {kk}) lies outside the FFT box \
                    {fftnx}×{fftny}×{fftnz}."
                )));
            }
            let Some(ipw) = grid.ixyz2ipw[(ii, jj, kk)] else {
                continue;
            };
            assigned[(ii, jj, kk)] = true;
            members.push(OrbitMember {
                ipw,
                miller: Vector3::new(
                    signed_index(ii, nx) as f64,
                    signed_index(jj, ny) as f64,
                    signed_index(kk, nz) as f64,
                ),
                inverse_op: *inverse_op,
            });
        }
        orbits.push(members);
    }
    log::debug!(
        "{} plane waves grouped into {} orbits.",
        grid.ixyz2ipw.iter().flatten().count(),
        orbits.len()
    );

    let ptrans = if group.pricell_loop {
        group.ptrans.as_slice()
    } else {
        &group.ptrans[..group.ptrans.len().min(1)]
    };
    let nptrans = ptrans.len().max(1) as f64;
    let phase_of = |member: &OrbitMember| -> Option<Complex<f64>> {
        let h = member.miller;
        let average = ptrans
            .iter()
            .map(|p| Complex::from_polar(1.0, 2.0 * PI * h.dot(p)))
            .sum::<Complex<f64>>()
            / nptrans;
        if tol.equal(average.re, 0.0) && tol.equal(average.im, 0.0) {
            return None;
        }
        let t = group.operations[member.inverse_op].translation;
        let phase = Complex::from_polar(1.0, 2.0 * PI * h.dot(&t)) * average;
        if tol.equal(phase.re, 1.0) && tol.equal(phase.im, 0.0) {
            Some(Complex::new(1.0, 0.0))
        } else {
            Some(phase)
        }
    };

    let source: &Array1<Complex<f64>> = rhog;
    let writes = orbits
        .par_iter()
        .map(|members| {
            let weighted = members
                .iter()
                .filter_map(|member| phase_of(member).map(|phase| (member.ipw, phase)))
                .collect_vec();
            if weighted.is_empty() {
                return vec![];
            }
            let average = weighted
                .iter()
                .map(|(ipw, phase)| source[*ipw] * phase)
                .sum::<Complex<f64>>()
                / weighted.len() as f64;
            weighted
                .into_iter()
                .map(|(ipw, phase)| (ipw, average / phase))
                .collect_vec()
        })
        .collect::<Vec<_>>();
    for (ipw, value) in writes.into_iter().flatten() {
        rhog[ipw] = value;
    }
    Ok(())
}
