//! 测试用合成衍射图样

use crate::models::Signal;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 在 [start, end] 上生成 n 个等间距点
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n < 2 {
        return vec![start; n];
    }
    let step = (end - start) / (n - 1) as f64;
    (0..n).map(|i| start + i as f64 * step).collect()
}

/// 由若干 Gaussian 峰（按峰高给出）叠加均匀噪声构造信号
pub struct PatternBuilder {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl PatternBuilder {
    pub fn new(start: f64, end: f64, n: usize) -> Self {
        let x = linspace(start, end, n);
        let y = vec![0.0; x.len()];
        Self { x, y }
    }

    /// 叠加峰高为 `height` 的 Gaussian
    pub fn gaussian(mut self, center: f64, sigma: f64, height: f64) -> Self {
        for (x, y) in self.x.iter().zip(self.y.iter_mut()) {
            let u = x - center;
            *y += height * (-u * u / (2.0 * sigma * sigma)).exp();
        }
        self
    }

    /// 叠加常数背景
    pub fn baseline(mut self, level: f64) -> Self {
        for y in self.y.iter_mut() {
            *y += level;
        }
        self
    }

    /// 叠加 [0, amplitude] 的均匀噪声
    pub fn noise(mut self, amplitude: f64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        for y in self.y.iter_mut() {
            *y += rng.gen_range(0.0..=amplitude);
        }
        self
    }

    pub fn build(self) -> Signal {
        Signal::new("synthetic", self.x, self.y).unwrap()
    }
}
