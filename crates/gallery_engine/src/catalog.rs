use gallery_core::{Category, ImageDescriptor, ImageId};
use rand::Rng;

/// Generates `count` descriptors with consecutive ids starting at `start_id`.
pub fn generate_batch<R: Rng + ?Sized>(
    rng: &mut R,
    start_id: ImageId,
    count: usize,
) -> Vec<ImageDescriptor> {
    (0..count as u64)
        .map(|offset| {
            let category = Category::ALL[rng.gen_range(0..Category::ALL.len())];
            let width = rng.gen_range(400..600);
            let height = rng.gen_range(300..600);
            ImageDescriptor::new(start_id + offset, category, width, height)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::generate_batch;

    #[test]
    fn ids_are_consecutive_and_sizes_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let batch = generate_batch(&mut rng, 17, 8);
        let ids: Vec<_> = batch.iter().map(|image| image.id).collect();
        assert_eq!(ids, (17..25).collect::<Vec<_>>());
        for image in &batch {
            assert!((400..600).contains(&image.width));
            assert!((300..600).contains(&image.height));
            assert!(image.url.ends_with(&format!("?random={}", image.id)));
        }
    }

    #[test]
    fn same_seed_gives_same_batch() {
        let first = generate_batch(&mut StdRng::seed_from_u64(1), 1, 16);
        let second = generate_batch(&mut StdRng::seed_from_u64(1), 1, 16);
        assert_eq!(first, second);
    }

    #[test]
    fn zero_count_is_empty() {
        assert!(generate_batch(&mut StdRng::seed_from_u64(1), 1, 0).is_empty());
    }
}
