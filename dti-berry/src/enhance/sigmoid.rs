use crate::{DtiMap, NiftiHeaderAttr, SegResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sigmoid 强度变换:
///
/// ```text
/// f(x) = (max - min) / (1 + exp(-(x - beta) / alpha)) + min
/// ```
///
/// `alpha` 控制过渡带宽度 (为负时曲线翻转), `beta` 为过渡中心.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sigmoid {
    /// 过渡带宽度.
    pub alpha: f64,

    /// 过渡中心.
    pub beta: f64,

    /// 输出下界.
    pub min: f64,

    /// 输出上界.
    pub max: f64,
}

impl Sigmoid {
    /// 创建输出范围为 `[0, 1]` 的变换.
    pub fn unit(alpha: f64, beta: f64) -> Self {
        Self {
            alpha,
            beta,
            min: 0.0,
            max: 1.0,
        }
    }

    /// 对单个值做变换.
    #[inline]
    pub fn apply(&self, x: f64) -> f64 {
        (self.max - self.min) / (1.0 + (-(x - self.beta) / self.alpha).exp()) + self.min
    }

    /// 对整幅图做变换, 返回新的图. 元信息与 `map` 相同.
    pub fn enhance(&self, map: &DtiMap) -> SegResult<DtiMap> {
        let data = map.data().mapv(|x| self.apply(x as f64) as f32);
        DtiMap::with_header(map.header(), data)
    }
}

#[cfg(test)]
mod tests {
    use super::Sigmoid;
    use crate::DtiMap;
    use ndarray::Array3;

    #[test]
    fn test_sigmoid_shape() {
        let s = Sigmoid::unit(0.1, 0.5);
        assert!((s.apply(0.5) - 0.5).abs() < 1e-12);
        assert!(s.apply(2.0) > 0.999);
        assert!(s.apply(-1.0) < 0.001);
        assert!(s.apply(0.4) < s.apply(0.6));

        let flipped = Sigmoid { alpha: -0.1, ..s };
        assert!(flipped.apply(0.4) > flipped.apply(0.6));

        let ranged = Sigmoid {
            min: 10.0,
            max: 20.0,
            ..s
        };
        assert!((ranged.apply(0.5) - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_enhance_map() {
        let map = DtiMap::fake(Array3::from_elem((2, 2, 2), 0.5), [1.0; 3]);
        let out = Sigmoid::unit(1.0, 0.5).enhance(&map).unwrap();
        assert!(out.data().iter().all(|v| (*v - 0.5).abs() < 1e-6));
    }
}
