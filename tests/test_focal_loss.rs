extern crate bvr_anchor_head;

use std::f32::consts::LN_2;

use approx::assert_abs_diff_eq;
use ndarray::{array, Array2, Array3};

use bvr_anchor_head::head::cls_loss::{cls_weights, one_hot_box_labels, weighted_loss};
use bvr_anchor_head::head::SigmoidFocalClassificationLoss;

#[test]
fn zero_logit_matches_closed_form() {
    let loss = SigmoidFocalClassificationLoss::default();
    let input = Array3::<f32>::zeros((1, 2, 1));
    let target = Array3::from_shape_vec((1, 2, 1), vec![1.0, 0.0]).unwrap();
    let weights = Array2::<f32>::ones((1, 2));

    let out = loss.forward(input.view(), target.view(), weights.view()).unwrap();

    // positive: 0.25 * 0.5^2 * ln2, negative: 0.75 * 0.5^2 * ln2
    assert_abs_diff_eq!(out[[0, 0, 0]], 0.0625 * LN_2, epsilon = 1e-6);
    assert_abs_diff_eq!(out[[0, 1, 0]], 0.1875 * LN_2, epsilon = 1e-6);
}

#[test]
fn weights_scale_each_anchor() {
    let loss = SigmoidFocalClassificationLoss::default();
    let input = array![[[0.3, -1.2], [2.0, 0.1]]];
    let target = array![[[1.0, 0.0], [0.0, 0.0]]];

    let unit = loss.forward(input.view(), target.view(), Array2::ones((1, 2)).view()).unwrap();
    let scaled = loss.forward(input.view(), target.view(), array![[0.5, 0.0]].view()).unwrap();

    assert_abs_diff_eq!(scaled[[0, 0, 0]], unit[[0, 0, 0]] * 0.5, epsilon = 1e-7);
    assert_abs_diff_eq!(scaled[[0, 0, 1]], unit[[0, 0, 1]] * 0.5, epsilon = 1e-7);
    assert_eq!(scaled[[0, 1, 0]], 0.0);
    assert_eq!(scaled[[0, 1, 1]], 0.0);
}

#[test]
fn confident_correct_predictions_cost_little() {
    let loss = SigmoidFocalClassificationLoss::default();
    let w = Array2::ones((1, 1));

    let right = loss.forward(array![[[6.0]]].view(), array![[[1.0]]].view(), w.view()).unwrap();
    let wrong = loss.forward(array![[[-6.0]]].view(), array![[[1.0]]].view(), w.view()).unwrap();

    assert!(right[[0, 0, 0]] < 1e-6);
    assert!(wrong[[0, 0, 0]] > 1.0);
}

#[test]
fn large_logits_stay_finite() {
    let loss = SigmoidFocalClassificationLoss::default();
    let out = loss
        .forward(array![[[100.0, -100.0]]].view(), array![[[0.0, 1.0]]].view(), Array2::ones((1, 1)).view())
        .unwrap();

    assert!(out.iter().all(|x| x.is_finite()));
    assert_abs_diff_eq!(out[[0, 0, 0]], 75.0, epsilon = 1e-3);
    assert_abs_diff_eq!(out[[0, 0, 1]], 25.0, epsilon = 1e-3);
}

#[test]
fn rejects_shape_mismatch() {
    let loss = SigmoidFocalClassificationLoss::default();
    let input = Array3::<f32>::zeros((1, 2, 3));

    assert!(loss
        .forward(input.view(), Array3::zeros((1, 2, 2)).view(), Array2::ones((1, 2)).view())
        .is_err());
    assert!(loss
        .forward(input.view(), Array3::zeros((1, 2, 3)).view(), Array2::ones((1, 3)).view())
        .is_err());
}

#[test]
fn one_hot_drops_background_and_ignored() {
    let labels = array![[-1i64, 0, 1, 2]];
    let one_hot = one_hot_box_labels(labels.view(), 2).unwrap();

    assert_eq!(one_hot.shape(), &[1, 4, 2]);
    assert_eq!(one_hot.row_sum_at(0), 0.0);
    assert_eq!(one_hot.row_sum_at(1), 0.0);
    assert_eq!(one_hot[[0, 2, 0]], 1.0);
    assert_eq!(one_hot[[0, 2, 1]], 0.0);
    assert_eq!(one_hot[[0, 3, 0]], 0.0);
    assert_eq!(one_hot[[0, 3, 1]], 1.0);
}

trait RowSum {
    fn row_sum_at(&self, m: usize) -> f32;
}

impl RowSum for Array3<f32> {
    fn row_sum_at(&self, m: usize) -> f32 {
        (0..self.shape()[2]).map(|c| self[[0, m, c]]).sum()
    }
}

#[test]
fn single_class_collapses_positive_labels() {
    let one_hot = one_hot_box_labels(array![[3i64, 0, 1]].view(), 1).unwrap();
    assert_eq!(one_hot.iter().copied().collect::<Vec<_>>(), vec![1.0, 0.0, 1.0]);
}

#[test]
fn rejects_out_of_range_labels() {
    assert!(one_hot_box_labels(array![[3i64]].view(), 2).is_err());
    assert!(one_hot_box_labels(array![[-2i64]].view(), 2).is_err());
}

#[test]
fn weights_normalise_by_positive_count() {
    let weights = cls_weights(array![[1i64, 0, -1, 2], [0, 0, -1, -1]].view());

    assert_eq!(weights.row(0).to_vec(), vec![0.5, 0.5, 0.0, 0.5]);
    assert_eq!(weights.row(1).to_vec(), vec![1.0, 1.0, 0.0, 0.0]);
}

#[test]
fn weighted_loss_averages_over_batch() {
    let loss = SigmoidFocalClassificationLoss::default();
    let preds = Array3::<f32>::zeros((2, 3, 1));
    let labels = array![[0i64, 0, 0], [0, -1, -1]];
    let one_hot = one_hot_box_labels(labels.view(), 1).unwrap();
    let weights = cls_weights(labels.view());

    let value = weighted_loss(&loss, preds.view(), one_hot.view(), weights.view(), 2, 1.0).unwrap();
    let scaled = weighted_loss(&loss, preds.view(), one_hot.view(), weights.view(), 2, 2.0).unwrap();

    // four background anchors at 0.1875 * ln2 each, over two samples
    assert_abs_diff_eq!(value, 4.0 * 0.1875 * LN_2 / 2.0, epsilon = 1e-6);
    assert_abs_diff_eq!(scaled, 2.0 * value, epsilon = 1e-6);
    assert!(weighted_loss(&loss, preds.view(), one_hot.view(), weights.view(), 0, 1.0).is_err());
}
