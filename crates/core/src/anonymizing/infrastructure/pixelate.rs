/// Pixelates an image buffer in place onto a `grid x grid` mosaic.
///
/// Equivalent to an area-average downscale to the grid followed by a
/// nearest-neighbor upscale back to the original size. Each axis of the grid
/// is capped at the image size, so tiny regions degrade gracefully.
pub fn pixelate_in_place(
    data: &mut [u8],
    width: usize,
    height: usize,
    channels: usize,
    grid: usize,
    sums: &mut Vec<u32>,
) {
    if width == 0 || height == 0 || grid == 0 {
        return;
    }
    let gw = grid.min(width);
    let gh = grid.min(height);

    // Accumulators per cell: one sum per channel plus a pixel count
    let stride = channels + 1;
    sums.clear();
    sums.resize(gw * gh * stride, 0);

    let cell = |x: usize, y: usize| (y * gh / height) * gw + (x * gw / width);

    for y in 0..height {
        for x in 0..width {
            let acc = cell(x, y) * stride;
            let px = (y * width + x) * channels;
            for c in 0..channels {
                sums[acc + c] += data[px + c] as u32;
            }
            sums[acc + channels] += 1;
        }
    }

    for y in 0..height {
        for x in 0..width {
            let acc = cell(x, y) * stride;
            let count = sums[acc + channels];
            let px = (y * width + x) * channels;
            for c in 0..channels {
                data[px + c] = ((sums[acc + c] + count / 2) / count) as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn gradient(width: usize, height: usize) -> Vec<u8> {
        (0..width * height)
            .flat_map(|i| {
                let v = (i * 7 % 256) as u8;
                [v, v / 2, 255 - v]
            })
            .collect()
    }

    fn distinct_pixels(data: &[u8]) -> usize {
        data.chunks_exact(3)
            .map(|p| (p[0], p[1], p[2]))
            .collect::<HashSet<_>>()
            .len()
    }

    #[test]
    fn test_output_has_at_most_grid_squared_colors() {
        let mut data = gradient(40, 30);
        let len = data.len();
        pixelate_in_place(&mut data, 40, 30, 3, 5, &mut Vec::new());

        assert_eq!(data.len(), len);
        assert!(distinct_pixels(&data) <= 25);
    }

    #[test]
    fn test_cells_are_uniform_blocks() {
        let mut data = gradient(10, 10);
        pixelate_in_place(&mut data, 10, 10, 3, 5, &mut Vec::new());

        // 10 / 5 → 2x2 blocks
        let px = |x: usize, y: usize| &data[(y * 10 + x) * 3..(y * 10 + x) * 3 + 3];
        assert_eq!(px(0, 0), px(1, 1));
        assert_eq!(px(2, 2), px(3, 3));
    }

    #[test]
    fn test_cell_value_is_average() {
        // Two columns, grid 1: every pixel becomes the mean
        let mut data = vec![0, 0, 0, 100, 100, 100];
        pixelate_in_place(&mut data, 2, 1, 3, 1, &mut Vec::new());
        assert_eq!(data, vec![50; 6]);
    }

    #[test]
    fn test_grid_larger_than_region_is_identity() {
        let original = gradient(3, 2);
        let mut data = original.clone();
        pixelate_in_place(&mut data, 3, 2, 3, 50, &mut Vec::new());
        assert_eq!(data, original);
    }
}
