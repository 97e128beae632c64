use nalgebra::{Matrix3, Vector3};

use crate::auxiliary::geometry::invert_lattice;
use crate::symmetrisation::{SymmetrisationError, SymmetrisationGroup};
use crate::symmetry::atom_map::AtomMap;

/// Symmetrises a per-atom vector quantity given in fractional components.
///
/// For every operation $`\{\mathbf{W}|\mathbf{t}\}`$ mapping atom $`j`$ onto atom $`l`$, the
/// rotated vector $`\mathbf{W}\mathbf{v}_j`$ is accumulated onto atom $`l`$. Each accumulated
/// vector is then divided by the number of operations that contributed to it. Atoms that no
/// operation reaches keep their original vector.
///
/// # Arguments
///
/// * `vectors` - The per-atom vectors in the global species-major order, modified in place.
/// * `group` - The symmetrisation group.
/// * `atom_map` - The atom map of `group`.
///
/// # Errors
///
/// Errors if the group is empty, or if the atom map does not cover every operation and atom.
pub fn symmetrize_vec3_nat(
    vectors: &mut [Vector3<f64>],
    group: &SymmetrisationGroup,
    atom_map: &AtomMap,
) -> Result<(), SymmetrisationError> {
    group.ensure_nonempty()?;
    if atom_map.n_operations() != group.nrotk()
        || atom_map.0.iter().any(|row| row.len() != vectors.len())
    {
        return Err(SymmetrisationError(format!(
            "the atom map covers {} operations, but {} operations on {} atoms are required.",
            atom_map.n_operations(),
            group.nrotk(),
            vectors.len()
        )));
    }

    let mut accumulated = vec![Vector3::zeros(); vectors.len()];
    let mut counts = vec![0_usize; vectors.len()];
    for (op, row) in group.operations.iter().zip(atom_map.0.iter()) {
        for (j, image) in row.iter().enumerate() {
            if let Some(l) = image {
                accumulated[*l] += op.rotation * vectors[j];
                counts[*l] += 1;
            }
        }
    }
    vectors
        .iter_mut()
        .zip(accumulated)
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .for_each(|((v, acc), count)| *v = acc / count as f64);
    Ok(())
}

/// Symmetrises a per-atom vector quantity given in Cartesian components, such as forces.
///
/// The vectors are converted to fractional components with the lattice, symmetrised with
/// [`symmetrize_vec3_nat`] and converted back.
///
/// # Errors
///
/// Errors if the lattice is singular, or for any reason [`symmetrize_vec3_nat`] errors.
pub fn symmetrize_cartesian_vec3_nat(
    vectors: &mut [Vector3<f64>],
    lattice: &Matrix3<f64>,
    group: &SymmetrisationGroup,
    atom_map: &AtomMap,
) -> Result<(), SymmetrisationError> {
    let inverse = invert_lattice(lattice).map_err(|err| SymmetrisationError(err.to_string()))?;
    vectors.iter_mut().for_each(|v| *v = inverse * *v);
    let result = symmetrize_vec3_nat(vectors, group, atom_map);
    vectors.iter_mut().for_each(|v| *v = lattice * *v);
    result
}

/// Symmetrises a Cartesian rank-2 tensor, such as the stress.
///
/// The tensor is expressed in the lattice basis as $`\mathbf{M}^{-1}\boldsymbol{\sigma}
/// \mathbf{M}^{-\mathsf{T}}`$, averaged as $`\frac{1}{N}\sum_g \mathbf{W}_g \boldsymbol{\sigma}_f
/// \mathbf{W}_g^{\mathsf{T}}`$ and transformed back.
///
/// # Errors
///
/// Errors if the group is empty or the lattice is singular.
pub fn symmetrize_mat3(
    sigma: &Matrix3<f64>,
    lattice: &Matrix3<f64>,
    group: &SymmetrisationGroup,
) -> Result<Matrix3<f64>, SymmetrisationError> {
    group.ensure_nonempty()?;
    let inverse = invert_lattice(lattice).map_err(|err| SymmetrisationError(err.to_string()))?;
    let fractional = inverse * sigma * inverse.transpose();
    let averaged = group
        .operations
        .iter()
        .map(|op| op.rotation * fractional * op.rotation.transpose())
        .sum::<Matrix3<f64>>()
        / group.nrotk() as f64;
    Ok(lattice * averaged * lattice.transpose())
}
