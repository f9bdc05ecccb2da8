use candle_core::{Device, Tensor};
use docqa_embed::masked_mean_l2;

fn pooled(states: &[f32], shape: (usize, usize, usize), mask: &[u32]) -> Vec<Vec<f32>> {
    let dev = Device::Cpu;
    let h = Tensor::from_slice(states, shape, &dev).unwrap();
    let m = Tensor::from_slice(mask, (shape.0, shape.1), &dev).unwrap();
    masked_mean_l2(&h, &m).unwrap().to_vec2().unwrap()
}

#[test]
fn padding_tokens_do_not_move_the_embedding() {
    let padded = pooled(&[1.0, 2.0, 3.0, 4.0, 100.0, -100.0], (1, 3, 2), &[1, 1, 0]);
    let unpadded = pooled(&[1.0, 2.0, 3.0, 4.0], (1, 2, 2), &[1, 1]);
    let norm = 13f32.sqrt();
    for (v, expected) in [(&padded[0], [2.0 / norm, 3.0 / norm]), (&unpadded[0], [2.0 / norm, 3.0 / norm])] {
        for (a, b) in v.iter().zip(expected) {
            assert!((a - b).abs() < 1e-5, "a={a} b={b}");
        }
    }
}

#[test]
fn masked_mean_l2_pools_each_row_separately() {
    let v = pooled(&[3.0, 0.0, 1.0, 1.0, 0.0, 2.0, 0.0, 4.0], (2, 2, 2), &[1, 0, 1, 1]);
    assert!((v[0][0] - 1.0).abs() < 1e-5 && v[0][1].abs() < 1e-5);
    assert!(v[1][0].abs() < 1e-5 && (v[1][1] - 1.0).abs() < 1e-5);
}

#[test]
fn every_row_has_unit_length() {
    let v = pooled(&[0.5, -1.5, 2.0, 7.0, 0.1, 0.2, 3.0, 3.0, -4.0, 9.0, 9.0, 9.0], (2, 2, 3), &[1, 1, 1, 0]);
    for row in &v {
        let len: f32 = row.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((len - 1.0).abs() < 1e-5, "len={len}");
    }
}
