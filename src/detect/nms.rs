//! Greedy non-maximum suppression with a containment-biased overlap.
//!
//! The overlap of a candidate against the kept box is
//! `intersection / area(candidate)`, not IoU. A box lying wholly inside a
//! kept box has overlap 1.0 and is always suppressed for thresholds below
//! 1.0, however large the kept box is.

use crate::detect::result::BoundingBox;

/// Deduplicate `boxes`, keeping one representative per overlapping cluster.
///
/// Boxes are ordered by `y2` ascending (stable). The last remaining box is
/// kept, and every remaining box whose overlap with it is strictly greater
/// than `overlap_threshold` is discarded. Kept boxes are returned in keep
/// order.
pub fn non_max_suppression(boxes: &[BoundingBox], overlap_threshold: f64) -> Vec<BoundingBox> {
    if boxes.is_empty() {
        return Vec::new();
    }

    let areas: Vec<i64> = boxes.iter().map(clamped_area).collect();

    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by_key(|&i| boxes[i].y2);

    let mut kept = Vec::new();
    while let Some(current) = order.pop() {
        let keep = boxes[current];
        kept.push(keep);

        order.retain(|&i| {
            let other = &boxes[i];
            let w = (keep.x2.min(other.x2) as i64 - keep.x1.max(other.x1) as i64 + 1).max(0);
            let h = (keep.y2.min(other.y2) as i64 - keep.y1.max(other.y1) as i64 + 1).max(0);
            let overlap = (w * h) as f64 / areas[i] as f64;
            overlap <= overlap_threshold
        });
    }

    kept
}

/// Area with degenerate boxes clamped to 1 so the overlap stays finite.
fn clamped_area(b: &BoundingBox) -> i64 {
    if let Err(err) = BoundingBox::try_new(b.x1, b.y1, b.x2, b.y2) {
        log::trace!("nms: {}, clamping to area 1", err);
        return 1;
    }
    b.raw_area().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(non_max_suppression(&[], 0.2).is_empty());
    }

    #[test]
    fn contained_box_is_suppressed() {
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
    fn kept_small_box_does_not_suppress_its_container() {
        // The tiny box is kept first (largest y2). Against it the big box's
        // overlap is tiny / big, well under the threshold, so both survive.
        let boxes = [
            BoundingBox::new(0, 0, 100, 100),
            BoundingBox::new(90, 95, 100, 110),
        ];
        let kept = non_max_suppression(&boxes, 0.2);
        assert_eq!(
            kept,
            vec![BoundingBox::new(90, 95, 100, 110), BoundingBox::new(0, 0, 100, 100)]
        );
    }

    #[test]
    fn disjoint_boxes_all_survive_in_keep_order() {
        let boxes = [
            BoundingBox::new(0, 0, 10, 10),
            BoundingBox::new(50, 0, 60, 30),
            BoundingBox::new(100, 0, 110, 20),
        ];
        let kept = non_max_suppression(&boxes, 0.2);
        assert_eq!(kept, vec![boxes[1], boxes[2], boxes[0]]);
    }

    #[test]
    fn ties_on_y2_keep_the_later_box_first() {
        let a = BoundingBox::new(0, 0, 10, 10);
        let b = BoundingBox::new(50, 0, 60, 10);
        assert_eq!(non_max_suppression(&[a, b], 0.2), vec![b, a]);
    }

    #[test]
    fn overlap_equal_to_threshold_is_kept() {
        // Candidate area 10x10 = 100, intersection 5x10 = 50 -> overlap 0.5.
        let kept_box = BoundingBox::new(5, 0, 40, 20);
        let candidate = BoundingBox::new(0, 0, 9, 9);
        assert_eq!(non_max_suppression(&[candidate, kept_box], 0.5).len(), 2);
        assert_eq!(non_max_suppression(&[candidate, kept_box], 0.49).len(), 1);
    }

    #[test]
    fn degenerate_boxes_do_not_panic() {
        let boxes = [
            BoundingBox::new(10, 10, 0, 0),
            BoundingBox::new(5, 5, 5, 5),
            BoundingBox::new(0, 0, 20, 20),
        ];
        let kept = non_max_suppression(&boxes, 0.2);
        assert!(kept.contains(&BoundingBox::new(0, 0, 20, 20)));
        assert!(!kept.is_empty());
    }
}
