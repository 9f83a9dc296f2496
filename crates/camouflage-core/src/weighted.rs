use rand::Rng;

/// Draw one index with probability proportional to its weight.
///
/// Samples `u` uniformly in `[0, total)` and returns the first index whose
/// running sum reaches `u`. Non-positive and non-finite weights are never
/// drawn. Returns `None` when nothing carries weight. If floating-point
/// accumulation leaves the scan short of `u`, the last weighted index wins.
pub fn pick_weighted<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Option<usize> {
    let usable = |w: f64| w.is_finite() && w > 0.0;
    let total: f64 = weights.iter().copied().filter(|&w| usable(w)).sum();
    if total <= 0.0 {
        return None;
    }

    let target = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    let mut last = None;
    for (idx, &w) in weights.iter().enumerate() {
        if !usable(w) {
            continue;
        }
        cumulative += w;
        if target <= cumulative {
            return Some(idx);
        }
        last = Some(idx);
    }
    last
}
