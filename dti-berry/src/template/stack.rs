//! 4D 样本栈的读取与归约.

use super::StatTemplate;
use crate::data::{get_shape_from_header, into_zhw};
use crate::{DtiMap, SegError, SegResult};
use ndarray::{ArrayD, ArrayViewD, Axis};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use std::path::Path;

/// 样本所在的轴 (nifti 原生顺序 `[W, H, z, N]`).
const SAMPLE_AXIS: Axis = Axis(3);

/// 获取 `[W, H, z, N]` 形式的样本视图.
///
/// 向量像素图像按 nifti 约定存为 5D `[W, H, z, 1, N]`, 时间轴长度为 1, 在此去掉.
fn samples_view(data: &ArrayD<f32>) -> SegResult<ArrayViewD<'_, f32>> {
    match data.ndim() {
        4 => Ok(data.view()),
        5 if data.len_of(Axis(3)) == 1 => Ok(data.index_axis(Axis(3), 0)),
        n => Err(SegError::BadStackShape(n)),
    }
}

/// 将 `[W, H, z, N]` 或 `[W, H, z, 1, N]` 样本栈归约为 `[W, H, z]` 的均值与总体标准差.
pub(super) fn reduce_samples(data: &ArrayD<f32>) -> SegResult<(ArrayD<f32>, ArrayD<f32>)> {
    let samples = samples_view(data)?;
    let mean = samples.mean_axis(SAMPLE_AXIS).ok_or(SegError::EmptyStack)?;
    let std = samples.std_axis(SAMPLE_AXIS, 0.0);
    log::debug!("Reduced {} samples per voxel", samples.len_of(SAMPLE_AXIS));
    Ok((mean, std))
}

/// 读取样本栈文件并归约为统计模板.
pub(super) fn reduce_stack_file(path: &Path) -> SegResult<StatTemplate> {
    let obj = ReaderOptions::new().read_file(path)?;
    let mut header: NiftiHeader = obj.header().clone();
    let samples = obj.into_volume().into_ndarray::<f32>()?;
    let (mean, std) = reduce_samples(&samples)?;
    log::debug!("Sample stack {} reduced", path.display());

    header.dim[0] = 3;
    header.dim[4] = 1;
    header.dim[5] = 1;
    let shape = get_shape_from_header(&header);
    let mean = DtiMap::with_header(&header, into_zhw(mean, shape)?)?;
    let std = DtiMap::with_header(&header, into_zhw(std, shape)?)?;
    StatTemplate::new(mean, std)
}

#[cfg(test)]
mod tests {
    use super::reduce_samples;
    use crate::SegError;
    use ndarray::{Array, IxDyn};

    #[test]
    fn test_reduce_samples() {
        // 2 个体素, 每个 4 个样本.
        let data = Array::from_shape_vec(
            IxDyn(&[2, 1, 1, 4]),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 5.0, 5.0, 5.0],
        )
        .unwrap();
        let (mean, std) = reduce_samples(&data).unwrap();
        assert_eq!(mean.shape(), &[2, 1, 1]);
        assert!((mean[[0, 0, 0]] - 2.5).abs() < 1e-6);
        assert!((mean[[1, 0, 0]] - 5.0).abs() < 1e-6);
        // 总体标准差: sqrt(1.25)
        assert!((std[[0, 0, 0]] - 1.25f32.sqrt()).abs() < 1e-6);
        assert_eq!(std[[1, 0, 0]], 0.0);
    }

    #[test]
    fn test_reduce_bad_stacks() {
        let flat = Array::<f32, _>::zeros(IxDyn(&[2, 2, 2]));
        assert!(matches!(
            reduce_samples(&flat),
            Err(SegError::BadStackShape(3))
        ));
        let empty = Array::<f32, _>::zeros(IxDyn(&[2, 2, 2, 0]));
        assert!(matches!(reduce_samples(&empty), Err(SegError::EmptyStack)));
        let timed = Array::<f32, _>::zeros(IxDyn(&[2, 2, 2, 3, 4]));
        assert!(matches!(
            reduce_samples(&timed),
            Err(SegError::BadStackShape(5))
        ));
    }

    #[test]
    fn test_reduce_vector_pixel_stack() {
        // [W, H, z, 1, N]: 2 个体素, 每个 4 个样本.
        let data = Array::from_shape_vec(
            IxDyn(&[2, 1, 1, 1, 4]),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 5.0, 5.0, 5.0],
        )
        .unwrap();
        let (mean, std) = reduce_samples(&data).unwrap();
        assert_eq!(mean.shape(), &[2, 1, 1]);
        assert!((mean[[0, 0, 0]] - 2.5).abs() < 1e-6);
        assert!((mean[[1, 0, 0]] - 5.0).abs() < 1e-6);
        assert!((std[[0, 0, 0]] - 1.25f32.sqrt()).abs() < 1e-6);
        assert_eq!(std[[1, 0, 0]], 0.0);
    }
}
