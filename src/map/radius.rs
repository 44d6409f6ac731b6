//! Chebyshev-disk cell enumeration used by map scatter operations

/// All in-bounds cells `(u', v')` with `max(|u'-u|, |v'-v|) <= radius`,
/// in row-major order. Cells outside `[0, size_u) x [0, size_v)` are
/// skipped rather than clamped.
pub fn cells_within_radius(
    u: u32,
    v: u32,
    radius: u32,
    size_u: u32,
    size_v: u32,
) -> Vec<(u32, u32)> {
    let r = radius as i64;
    let (cu, cv) = (u as i64, v as i64);
    let mut cells = Vec::new();

    for dv in -r..=r {
        let av = cv + dv;
        if av < 0 || av >= size_v as i64 {
            continue;
        }
        for du in -r..=r {
            let au = cu + du;
            if au < 0 || au >= size_u as i64 {
                continue;
            }
            cells.push((au as u32, av as u32));
        }
    }

    cells
}
