//! Scanline stack-based flood fill.

/// Label for pixels no fill has claimed yet.
pub(crate) const UNCLAIMED: u32 = 0;

/// Flood from `seed`, claiming every connected pixel for which `accept` holds.
///
/// `labels` is a row-major `width * height` buffer; claimed pixels get
/// `label` (which must not be [`UNCLAIMED`]) and are passed to `visit`
/// exactly once. Returns the number of pixels claimed. A seed that is out of
/// range, already claimed, or not accepted claims nothing.
pub(crate) fn scanline_fill<A, V>(
    width: u32,
    height: u32,
    seed: (u32, u32),
    labels: &mut [u32],
    label: u32,
    mut accept: A,
    mut visit: V,
) -> usize
where
    A: FnMut(u32, u32) -> bool,
    V: FnMut(u32, u32),
{
    debug_assert_ne!(label, UNCLAIMED);
    debug_assert_eq!(labels.len(), width as usize * height as usize);

    let (sx, sy) = seed;
    if sx >= width || sy >= height {
        return 0;
    }

    let w = width as usize;
    let mut filled = 0;
    let mut stack: Vec<(u32, u32)> = Vec::with_capacity(256);
    stack.push(seed);

    while let Some((x, y)) = stack.pop() {
        let row = y as usize * w;
        if labels[row + x as usize] != UNCLAIMED || !accept(x, y) {
            continue;
        }

        // Extend the span left and right along the row.
        let mut left = x;
        while left > 0 && labels[row + left as usize - 1] == UNCLAIMED && accept(left - 1, y) {
            left -= 1;
        }
        let mut right = x;
        while right + 1 < width && labels[row + right as usize + 1] == UNCLAIMED && accept(right + 1, y) {
            right += 1;
        }

        for px in left..=right {
            labels[row + px as usize] = label;
            visit(px, y);
        }
        filled += (right - left + 1) as usize;

        // Queue one seed per run of candidate pixels in the rows above and below.
        let neighbours = [y.checked_sub(1), (y + 1 < height).then_some(y + 1)];
        for ny in neighbours.into_iter().flatten() {
            let nrow = ny as usize * w;
            let mut in_run = false;
            for px in left..=right {
                let open = labels[nrow + px as usize] == UNCLAIMED && accept(px, ny);
                if open && !in_run {
                    stack.push((px, ny));
                }
                in_run = open;
            }
        }
    }

    filled
}
