use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use temporal_motion::{non_max_suppression, BoundingBox};

/// Random boxes with pairwise distinct `y2`, so the greedy order is total.
fn random_boxes(rng: &mut StdRng, n: usize) -> Vec<BoundingBox> {
    let mut bottoms: Vec<i32> = (60..400).collect();
    bottoms.shuffle(rng);
    bottoms
        .into_iter()
        .take(n)
        .map(|y2| {
            let h = rng.gen_range(0..60);
            let x1 = rng.gen_range(0..300);
            let w = rng.gen_range(0..120);
            BoundingBox::new(x1, y2 - h, x1 + w, y2)
        })
        .collect()
}

fn overlap(candidate: &BoundingBox, kept: &BoundingBox) -> f64 {
    let w = (kept.x2.min(candidate.x2) - kept.x1.max(candidate.x1) + 1).max(0) as f64;
    let h = (kept.y2.min(candidate.y2) - kept.y1.max(candidate.y1) + 1).max(0) as f64;
    w * h / candidate.raw_area() as f64
}

#[test]
fn suppression_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for round in 0..200 {
        let n = rng.gen_range(0..25);
        let threshold = [0.0, 0.2, 0.3, 0.5, 0.9][round % 5];
        let boxes = random_boxes(&mut rng, n);
        let once = non_max_suppression(&boxes, threshold);
        let twice = non_max_suppression(&once, threshold);
        assert_eq!(once, twice, "round {round}, threshold {threshold}");
    }
}

#[test]
fn tied_bottoms_can_shrink_on_a_second_pass() {
    // With equal y2 the later input is kept first, so the two passes divide
    // the shared strip by different areas.
    let wide = BoundingBox::new(0, 0, 100, 10);
    let narrow = BoundingBox::new(95, 0, 105, 10);

    let once = non_max_suppression(&[wide, narrow], 0.2);
    assert_eq!(once, vec![narrow, wide]);

    let twice = non_max_suppression(&once, 0.2);
    assert_eq!(twice, vec![wide]);
    assert_eq!(non_max_suppression(&twice, 0.2), twice);
}

#[test]
fn every_dropped_box_overlaps_a_kept_box() {
    let mut rng = StdRng::seed_from_u64(17);
    for round in 0..200 {
        let boxes = random_boxes(&mut rng, 20);
        let threshold = 0.3;
        let kept = non_max_suppression(&boxes, threshold);

        for b in &boxes {
            if kept.contains(b) {
                continue;
            }
            assert!(
                kept.iter().any(|k| overlap(b, k) > threshold),
                "round {round}: {:?} dropped without a covering box",
                b
            );
        }
        for (i, later) in kept.iter().enumerate() {
            for earlier in &kept[..i] {
                assert!(overlap(later, earlier) <= threshold, "round {round}");
            }
        }
    }
}

#[test]
fn contained_box_is_suppressed_whatever_the_container_size() {
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..500 {
        let side = rng.gen_range(4..2000);
        let outer = BoundingBox::new(0, 0, side, side);
        let x1 = rng.gen_range(0..side - 1);
        let y1 = rng.gen_range(0..side - 1);
        let x2 = rng.gen_range(x1..side);
        let y2 = rng.gen_range(y1..side);
        let inner = BoundingBox::new(x1, y1, x2, y2);
        let threshold = rng.gen_range(0.0..0.999);

        assert_eq!(non_max_suppression(&[outer, inner], threshold), vec![outer]);
        assert_eq!(non_max_suppression(&[inner, outer], threshold), vec![outer]);
    }
}

#[test]
fn no_kept_box_lies_inside_another() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..200 {
        let boxes = random_boxes(&mut rng, 30);
        let kept = non_max_suppression(&boxes, 0.2);
        for (i, a) in kept.iter().enumerate() {
            for (j, b) in kept.iter().enumerate() {
                if i != j {
                    assert!(!a.contains(b), "{:?} contains {:?}", a, b);
                }
            }
        }
    }
}

#[test]
fn nested_pair_reduces_to_outer_box() {
    let boxes = [
        BoundingBox::new(0, 0, 100, 100),
        BoundingBox::new(10, 10, 60, 60),
    ];
    assert_eq!(
        non_max_suppression(&boxes, 0.2),
        vec![BoundingBox::new(0, 0, 100, 100)]
    );
}

#[test]
fn disjoint_boxes_all_survive_in_descending_bottom_order() {
    let boxes = [
        BoundingBox::new(0, 0, 10, 10),
        BoundingBox::new(50, 50, 60, 70),
        BoundingBox::new(100, 0, 120, 30),
    ];
    assert_eq!(
        non_max_suppression(&boxes, 0.0),
        vec![boxes[1], boxes[2], boxes[0]]
    );
}
