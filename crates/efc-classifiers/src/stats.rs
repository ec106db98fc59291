use ndarray::Array1;

/// Energy threshold at a quantile of a class's own training energies.
///
/// The energies are sorted ascending and the value at rank
/// `floor(n * quantile)` is returned. The rank is clamped to the last element
/// so a quantile that rounds up to `n` still yields a value.
///
/// # Arguments
///
/// * `energies` - Training energies of one class, in any order.
/// * `quantile` - Cutoff quantile in `(0, 1)`.
///
/// # Returns
///
/// `None` when `energies` is empty.
pub fn energy_cutoff(energies: &Array1<f64>, quantile: f64) -> Option<f64> {
    if energies.is_empty() {
        return None;
    }
    let mut sorted = energies.to_vec();
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));
    let rank = ((sorted.len() as f64) * quantile).floor() as usize;
    Some(sorted[rank.min(sorted.len() - 1)])
}
